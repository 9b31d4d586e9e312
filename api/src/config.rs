use anyhow::{anyhow, Context, Result};
use doc_chat::gemini_service::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use std::path::PathBuf;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub database_path: PathBuf,
    pub upload_temp_dir: PathBuf,
    pub tesseract_bin: PathBuf,
    pub cors_origin: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let gemini_api_key =
            var("GEMINI_API_KEY").ok_or_else(|| anyhow!("GEMINI_API_KEY environment variable not set"))?;

        let port = match var("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a port number, got {raw:?}"))?,
            None => DEFAULT_PORT,
        };
        let max_upload_bytes = match var("MAX_UPLOAD_BYTES") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("MAX_UPLOAD_BYTES must be a byte count, got {raw:?}"))?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            gemini_api_key,
            gemini_model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_base_url: var("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            database_path: var("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("doc_chat.db")),
            upload_temp_dir: var("UPLOAD_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join("doc_chat_uploads")),
            tesseract_bin: var("TESSERACT_BIN")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("tesseract")),
            cors_origin: var("CORS_ORIGIN").unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string()),
            port,
            max_upload_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("GEMINI_API_KEY", "secret")]).unwrap();
        assert_eq!(config.gemini_model, "gemini-1.5-flash-8b");
        assert_eq!(config.port, 8000);
        assert_eq!(config.cors_origin, "http://localhost:3000");
        assert_eq!(config.database_path, PathBuf::from("doc_chat.db"));
        assert!(config.upload_temp_dir.ends_with("doc_chat_uploads"));
    }

    #[test]
    fn test_api_key_required() {
        let err = config_from(&[("PORT", "9000")]).unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
        assert!(config_from(&[("GEMINI_API_KEY", "  ")]).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("GEMINI_API_KEY", "secret"),
            ("PORT", "9001"),
            ("GEMINI_MODEL", "gemini-2.0-flash"),
            ("MAX_UPLOAD_BYTES", "1024"),
            ("TESSERACT_BIN", "/opt/tess/bin/tesseract"),
        ])
        .unwrap();
        assert_eq!(config.port, 9001);
        assert_eq!(config.gemini_model, "gemini-2.0-flash");
        assert_eq!(config.max_upload_bytes, 1024);
        assert_eq!(config.tesseract_bin, PathBuf::from("/opt/tess/bin/tesseract"));
    }

    #[test]
    fn test_bad_port_is_rejected() {
        let err = config_from(&[("GEMINI_API_KEY", "secret"), ("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}

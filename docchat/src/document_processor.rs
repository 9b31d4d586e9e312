use crate::error::DocChatError;
use crate::ocr::OcrEngine;
use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use quick_xml::events::Event;
use quick_xml::Reader as XmlReader;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use zip::ZipArchive;

pub const UNSUPPORTED_FORMAT_TEXT: &str = "SORRY PDFs ARE CURRENTLY UNSUPPORTED FORMAT";
pub const OCR_LANGUAGE: &str = "eng";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// Fixed placeholder, nothing is parsed.
    Unsupported,
    Ocr,
    Csv,
    Spreadsheet,
    Docx,
    Verbatim,
}

/// Suffix table in precedence order.
const DEFAULT_FORMATS: &[(&str, ExtractionStrategy)] = &[
    (".pdf", ExtractionStrategy::Unsupported),
    (".png", ExtractionStrategy::Ocr),
    (".jpg", ExtractionStrategy::Ocr),
    (".jpeg", ExtractionStrategy::Ocr),
    (".csv", ExtractionStrategy::Csv),
    (".xlsx", ExtractionStrategy::Spreadsheet),
    (".xls", ExtractionStrategy::Spreadsheet),
    (".docx", ExtractionStrategy::Docx),
];

pub struct DocumentProcessor {
    formats: Vec<(String, ExtractionStrategy)>,
    ocr: Arc<dyn OcrEngine>,
    temp_dir: PathBuf,
}

impl DocumentProcessor {
    pub fn new(ocr: Arc<dyn OcrEngine>, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            formats: DEFAULT_FORMATS
                .iter()
                .map(|(suffix, strategy)| (suffix.to_string(), *strategy))
                .collect(),
            ocr,
            temp_dir: temp_dir.into(),
        }
    }

    /// Adds a suffix after the existing entries; earlier entries still win.
    pub fn register(&mut self, suffix: impl Into<String>, strategy: ExtractionStrategy) -> &mut Self {
        self.formats.push((suffix.into(), strategy));
        self
    }

    /// Case-sensitive; the first matching suffix wins, anything else is read verbatim.
    pub fn strategy_for(&self, file_name: &str) -> ExtractionStrategy {
        self.formats
            .iter()
            .find(|(suffix, _)| file_name.ends_with(suffix.as_str()))
            .map(|(_, strategy)| *strategy)
            .unwrap_or(ExtractionStrategy::Verbatim)
    }

    /// Writes `bytes` to a private temporary file, extracts its text and
    /// removes the file again on every path out of this function.
    pub async fn extract(&self, file_name: &str, bytes: &[u8]) -> Result<String, DocChatError> {
        let strategy = self.strategy_for(file_name);
        log::info!("Extracting {file_name} with {strategy:?}");

        let wrap = |cause: anyhow::Error| DocChatError::Extraction {
            file_name: file_name.to_string(),
            cause,
        };

        let upload = self.write_temp(file_name, bytes).await.map_err(wrap)?;
        let result = self.dispatch(strategy, upload.path()).await;
        if let Err(err) = upload.close() {
            log::warn!("Failed to remove temporary upload for {file_name}: {err}");
        }
        result.map_err(wrap)
    }

    async fn write_temp(&self, file_name: &str, bytes: &[u8]) -> Result<NamedTempFile> {
        tokio::fs::create_dir_all(&self.temp_dir)
            .await
            .with_context(|| format!("cannot create {}", self.temp_dir.display()))?;

        let dir = self.temp_dir.clone();
        let suffix = temp_suffix(file_name);
        let bytes = bytes.to_vec();
        run_blocking(move || {
            let mut file = tempfile::Builder::new()
                .prefix("upload-")
                .suffix(&suffix)
                .tempfile_in(&dir)?;
            file.write_all(&bytes)?;
            file.flush()?;
            Ok(file)
        })
        .await
    }

    async fn dispatch(&self, strategy: ExtractionStrategy, path: &Path) -> Result<String> {
        match strategy {
            ExtractionStrategy::Unsupported => Ok(UNSUPPORTED_FORMAT_TEXT.to_string()),
            ExtractionStrategy::Ocr => {
                let text = self.ocr.recognize(path, OCR_LANGUAGE).await?;
                Ok(text.trim().to_string())
            }
            ExtractionStrategy::Csv => {
                let path = path.to_path_buf();
                run_blocking(move || read_csv(&path)).await
            }
            ExtractionStrategy::Spreadsheet => {
                let path = path.to_path_buf();
                run_blocking(move || read_spreadsheet(&path)).await
            }
            ExtractionStrategy::Docx => {
                let path = path.to_path_buf();
                run_blocking(move || read_docx(&path)).await
            }
            ExtractionStrategy::Verbatim => {
                let bytes = tokio::fs::read(path).await?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
        }
    }
}

async fn run_blocking<T, F>(job: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|err| anyhow!(err.to_string()))?
}

/// Keeps the upload's extension so parsers that sniff by name still work.
fn temp_suffix(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 16)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

/// Every row must have the same number of fields as the first one.
fn read_csv(path: &Path) -> Result<String> {
    let raw = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&raw);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().collect::<Vec<_>>().join(", "));
    }
    Ok(rows.join("\n"))
}

fn read_spreadsheet(path: &Path) -> Result<String> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|err| anyhow!("spreadsheet open failed: {err}"))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("workbook has no worksheets"))?
        .map_err(|err| anyhow!("worksheet read failed: {err}"))?;

    let rows = range.rows().map(spreadsheet_row).collect::<Vec<_>>();
    Ok(rows.join("\n"))
}

/// Cells up to the last filled one; calamine pads rows to the range width.
fn spreadsheet_row(row: &[Data]) -> String {
    let filled = row
        .iter()
        .rposition(|cell| !matches!(cell, Data::Empty))
        .map_or(0, |last| last + 1);
    row[..filled]
        .iter()
        .map(cell_to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) => text.to_string(),
        _ => cell.to_string(),
    }
}

fn read_docx(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file).context("not a docx archive")?;
    let mut entry = archive
        .by_name("word/document.xml")
        .context("docx has no word/document.xml")?;
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    docx_raw_text(&xml)
}

/// Plain text of a WordprocessingML body: runs concatenated, each paragraph
/// followed by a blank line.
fn docx_raw_text(xml: &str) -> Result<String> {
    let mut reader = XmlReader::from_str(xml);
    let mut text = String::new();
    let mut in_run = false;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"r" => in_run = true,
                b"t" => in_text = true,
                b"tab" if in_run => text.push('\t'),
                b"br" | b"cr" if in_run => text.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" if in_run => text.push('\t'),
                b"br" | b"cr" if in_run => text.push('\n'),
                b"p" => text.push_str("\n\n"),
                _ => {}
            },
            Event::Text(e) if in_text => text.push_str(&e.unescape()?),
            Event::End(e) => match e.local_name().as_ref() {
                b"r" => in_run = false,
                b"t" => in_text = false,
                b"p" => text.push_str("\n\n"),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(text)
}

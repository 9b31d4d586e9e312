use crate::error::PartError;
use crate::models::{IncomingTurn, Part};
use futures::{Stream, StreamExt};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    Text,
    Model,
    UserId,
    FileName,
    SessionId,
    Incognito,
    File,
}

/// Once all of these have been seen, the rest of the body is left unread.
/// `sessionId` is deliberately not part of the set.
pub const REQUIRED_FIELDS: [FormField; 6] = [
    FormField::Text,
    FormField::Model,
    FormField::UserId,
    FormField::FileName,
    FormField::File,
    FormField::Incognito,
];

#[derive(Debug, Default)]
pub struct FieldAccumulator {
    turn: IncomingTurn,
    seen: HashSet<FormField>,
}

impl FieldAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&mut self, part: Part) {
        match part {
            Part::File(file) => {
                // last file wins
                self.turn.file = Some(file);
                self.seen.insert(FormField::File);
            }
            Part::Value { name, value } => {
                let field = match name.as_str() {
                    "text" => {
                        self.turn.text = value;
                        FormField::Text
                    }
                    "model" => {
                        self.turn.model_name = value;
                        FormField::Model
                    }
                    "user_id" => {
                        self.turn.user_id = value;
                        FormField::UserId
                    }
                    "fileName" => {
                        self.turn.file_name = non_empty(value);
                        FormField::FileName
                    }
                    "sessionId" => {
                        self.turn.session_id = non_empty(value);
                        FormField::SessionId
                    }
                    "incognito" => {
                        self.turn.incognito = value == "true";
                        FormField::Incognito
                    }
                    _ => {
                        log::debug!("Ignoring unknown form field {name:?}");
                        return;
                    }
                };
                self.seen.insert(field);
            }
        }
    }

    #[cfg(test)]
    fn has_seen(&self, field: FormField) -> bool {
        self.seen.contains(&field)
    }

    pub fn is_complete(&self) -> bool {
        REQUIRED_FIELDS.iter().all(|field| self.seen.contains(field))
    }

    pub fn finish(self) -> IncomingTurn {
        self.turn
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Drains `parts` until every required field has arrived or the stream ends.
///
/// An inner `Err` is one part that could not be used; it is logged and
/// skipped. An outer `Err` means the body itself broke and is returned as is.
/// Parts after the point of completion are never polled.
pub async fn accumulate<S, E>(mut parts: S) -> Result<IncomingTurn, E>
where
    S: Stream<Item = Result<Result<Part, PartError>, E>> + Unpin,
{
    let mut accumulator = FieldAccumulator::new();
    while let Some(item) = parts.next().await {
        match item? {
            Ok(part) => accumulator.accept(part),
            Err(err) => log::warn!("Skipping malformed part: {err}"),
        }
        if accumulator.is_complete() {
            log::debug!("All required fields received, leaving remaining parts unread");
            break;
        }
    }
    Ok(accumulator.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UploadedFile;
    use futures::stream;

    type Item = Result<Result<Part, PartError>, String>;

    fn value(name: &str, value: &str) -> Item {
        Ok(Ok(Part::Value {
            name: name.to_string(),
            value: value.to_string(),
        }))
    }

    fn file(name: &str, bytes: &[u8]) -> Item {
        Ok(Ok(Part::File(UploadedFile {
            file_name: name.to_string(),
            bytes: bytes.to_vec(),
        })))
    }

    #[tokio::test]
    async fn test_collects_named_values() {
        let parts = stream::iter(vec![
            value("text", "hello"),
            value("model", "gemini"),
            value("user_id", "u1"),
            value("sessionId", "123"),
            value("incognito", "true"),
        ]);
        let turn = accumulate(parts).await.unwrap();
        assert_eq!(turn.text, "hello");
        assert_eq!(turn.model_name, "gemini");
        assert_eq!(turn.user_id, "u1");
        assert_eq!(turn.session_id.as_deref(), Some("123"));
        assert!(turn.incognito);
        assert!(turn.file.is_none());
    }

    #[tokio::test]
    async fn test_missing_fields_default() {
        let turn = accumulate(stream::iter(Vec::<Item>::new())).await.unwrap();
        assert_eq!(turn, IncomingTurn::default());
    }

    #[tokio::test]
    async fn test_incognito_only_for_literal_true() {
        for raw in ["TRUE", "1", "yes", ""] {
            let turn = accumulate(stream::iter(vec![value("incognito", raw)]))
                .await
                .unwrap();
            assert!(!turn.incognito, "{raw:?} must not enable incognito");
        }
    }

    #[tokio::test]
    async fn test_empty_session_id_is_absent() {
        let turn = accumulate(stream::iter(vec![value("sessionId", "")]))
            .await
            .unwrap();
        assert_eq!(turn.session_id, None);
    }

    #[tokio::test]
    async fn test_malformed_part_does_not_block_later_file() {
        let parts = stream::iter(vec![
            value("text", "summarise"),
            Ok(Err(PartError::new(Some("model"), "invalid utf-8"))),
            file("notes.txt", b"body"),
        ]);
        let turn = accumulate(parts).await.unwrap();
        assert_eq!(turn.text, "summarise");
        assert_eq!(turn.model_name, "");
        let upload = turn.file.expect("file part should be kept");
        assert_eq!(upload.file_name, "notes.txt");
        assert_eq!(upload.bytes, b"body");
    }

    #[tokio::test]
    async fn test_last_file_wins() {
        let parts = stream::iter(vec![file("a.txt", b"first"), file("b.csv", b"second")]);
        let turn = accumulate(parts).await.unwrap();
        assert_eq!(turn.file.unwrap().file_name, "b.csv");
    }

    #[tokio::test]
    async fn test_stops_once_required_fields_seen() {
        let mut parts = stream::iter(vec![
            value("text", "q"),
            value("model", "m"),
            value("user_id", "u"),
            value("fileName", "label"),
            file("doc.txt", b"x"),
            value("incognito", "false"),
            value("sessionId", "never-read"),
        ]);
        let turn = accumulate(&mut parts).await.unwrap();
        assert_eq!(turn.session_id, None);
        assert_eq!(turn.file_name.as_deref(), Some("label"));

        let leftover = parts.next().await.unwrap().unwrap().unwrap();
        assert_eq!(
            leftover,
            Part::Value {
                name: "sessionId".into(),
                value: "never-read".into()
            }
        );
    }

    #[tokio::test]
    async fn test_broken_body_is_returned() {
        let parts = stream::iter(vec![
            value("text", "q"),
            Err("stream ended early".to_string()),
            value("model", "never-read"),
        ]);
        let err = accumulate(parts).await.unwrap_err();
        assert_eq!(err, "stream ended early");
    }

    #[test]
    fn test_complete_requires_file() {
        let mut accumulator = FieldAccumulator::new();
        for name in ["text", "model", "user_id", "fileName", "incognito"] {
            accumulator.accept(Part::Value {
                name: name.to_string(),
                value: "v".to_string(),
            });
        }
        assert!(!accumulator.is_complete());
        assert!(!accumulator.has_seen(FormField::File));
        accumulator.accept(Part::File(UploadedFile {
            file_name: "x.txt".into(),
            bytes: vec![],
        }));
        assert!(accumulator.is_complete());
    }
}

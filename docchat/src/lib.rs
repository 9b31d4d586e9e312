pub mod chat_service;
pub mod chat_store;
pub mod document_processor;
pub mod error;
pub mod field_accumulator;
pub mod gemini_service;
pub mod models;
pub mod ocr;
pub mod prompt;
pub mod session;

pub use chat_service::ChatService;
pub use chat_store::{ChatStore, SqliteChatStore};
pub use document_processor::{DocumentProcessor, ExtractionStrategy};
pub use error::{DocChatError, PartError};
pub use field_accumulator::{accumulate, FieldAccumulator};
pub use gemini_service::{GeminiService, TextGenerator};
pub use models::*;
pub use ocr::{OcrEngine, TesseractOcr};
pub use session::SessionIds;

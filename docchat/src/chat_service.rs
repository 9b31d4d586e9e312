use crate::chat_store::ChatStore;
use crate::document_processor::DocumentProcessor;
use crate::error::DocChatError;
use crate::gemini_service::TextGenerator;
use crate::models::*;
use crate::prompt::{generation_prompt, recorded_user_text, SYSTEM_PROMPT};
use crate::session::SessionIds;
use chrono::Utc;
use std::sync::Arc;

/// Runs one turn: document context, generation, persistence.
pub struct ChatService {
    processor: DocumentProcessor,
    generator: Arc<dyn TextGenerator>,
    store: Arc<dyn ChatStore>,
    session_ids: Arc<SessionIds>,
}

impl ChatService {
    pub fn new(
        processor: DocumentProcessor,
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn ChatStore>,
        session_ids: Arc<SessionIds>,
    ) -> Self {
        Self {
            processor,
            generator,
            store,
            session_ids,
        }
    }

    pub async fn handle(&self, mut turn: IncomingTurn) -> Result<TurnReply, DocChatError> {
        let session_id = self.session_ids.resolve(turn.session_id.as_deref());

        let document = match turn.file.take() {
            Some(upload) => {
                self.processor
                    .extract(&upload.file_name, &upload.bytes)
                    .await?
            }
            None => match turn.session_id.as_deref() {
                Some(previous) => self.fallback_content(previous).await?,
                None => String::new(),
            },
        };

        let prompt = generation_prompt(&document, &turn.text);
        let user_text = recorded_user_text(turn.file_name.as_deref(), &turn.text);

        let ai_response = self
            .generator
            .generate(SYSTEM_PROMPT, &prompt)
            .await
            .map_err(DocChatError::Generation)?;

        if turn.incognito {
            log::info!("Incognito turn for session {session_id}, not persisting");
        } else {
            let record = ChatRecord {
                session_id: session_id.clone(),
                timestamp: Utc::now(),
                user_text: user_text.clone(),
                user_id: turn.user_id,
                file_name: turn.file_name.clone(),
                model_name: turn.model_name,
                ai_response: ai_response.clone(),
            };
            self.store
                .append(&record)
                .await
                .map_err(DocChatError::Persistence)?;
        }

        Ok(TurnReply {
            user_text,
            ai_text: ai_response,
            file_name: turn.file_name.unwrap_or_default(),
            session_id,
        })
    }

    /// The previous answer in this session stands in for a document. A
    /// session with no history contributes nothing.
    pub async fn fallback_content(&self, session_id: &str) -> Result<String, DocChatError> {
        let previous = self
            .store
            .latest_for_session(session_id)
            .await
            .map_err(DocChatError::Persistence)?;
        log::debug!(
            "Session {session_id} fallback {}",
            if previous.is_some() { "found" } else { "missing" }
        );
        Ok(previous.map(|record| record.ai_response).unwrap_or_default())
    }
}

use crate::error::ApiError;
use axum::{
    extract::{
        multipart::{Field, MultipartError},
        DefaultBodyLimit, Multipart, State,
    },
    routing::post,
    Json, Router,
};
use doc_chat::{accumulate, ChatService, Part, PartError, TurnReply, UploadedFile};
use futures::Stream;
use std::sync::Arc;

pub struct AppState {
    pub chat: ChatService,
}

pub fn router(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new().route(
        "/doc-chat",
        post(handle_doc_chat).layer(DefaultBodyLimit::max(max_upload_bytes)),
    )
}

async fn handle_doc_chat(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<TurnReply>, ApiError> {
    let turn = accumulate(Box::pin(multipart_parts(multipart))).await?;
    log::info!(
        "doc-chat turn from user {:?} (file: {}, session: {:?}, incognito: {})",
        turn.user_id,
        turn.file.as_ref().map(|f| f.file_name.as_str()).unwrap_or("-"),
        turn.session_id,
        turn.incognito,
    );

    let reply = state.chat.handle(turn).await?;
    Ok(Json(reply))
}

type PartItem = Result<Result<Part, PartError>, MultipartError>;

/// Lazily yields the body's parts. A part with unusable contents becomes an
/// inner `Err`; a body that cannot be read (too large, truncated) becomes an
/// outer `Err` and ends the stream.
fn multipart_parts(multipart: Multipart) -> impl Stream<Item = PartItem> {
    futures::stream::unfold(Some(multipart), |state| async move {
        let mut multipart = state?;
        let item = match multipart.next_field().await {
            Ok(Some(field)) => read_part(field).await,
            Ok(None) => return None,
            Err(err) => return Some((Err(err), None)),
        };
        let next = item.is_ok().then_some(multipart);
        Some((item, next))
    })
}

async fn read_part(field: Field<'_>) -> PartItem {
    let name = field.name().map(str::to_string);
    let file_name = field.file_name().map(str::to_string);
    let bytes = field.bytes().await?;

    if let Some(file_name) = file_name {
        return Ok(Ok(Part::File(UploadedFile {
            file_name,
            bytes: bytes.to_vec(),
        })));
    }

    let Some(name) = name else {
        return Ok(Err(PartError::new(None, "part has no field name")));
    };
    Ok(match String::from_utf8(bytes.to_vec()) {
        Ok(value) => Ok(Part::Value { name, value }),
        Err(_) => Err(PartError::new(Some(name.as_str()), "value is not valid UTF-8")),
    })
}

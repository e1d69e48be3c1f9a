//! Document upload, listing and deletion.

use axum::Json;
use axum::body::Bytes;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use docsearch_rag::{Chunker, Segment, load_document, tag_chunks};
use serde_json::{Value, json};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ApiError;
use crate::filename::{extension, secure_filename};
use crate::state::AppState;

const FILE_FIELD: &str = "file";

/// `POST /api/documents`: store a multipart `file` as searchable chunks.
pub async fn upload_document(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut multipart = multipart.map_err(|_| ApiError::bad_request("No file provided"))?;
    let limit = state.settings.max_file_size;

    let (original_name, data) = read_file_field(&mut multipart, limit)
        .await?
        .ok_or_else(|| ApiError::bad_request("No file provided"))?;

    if original_name.is_empty() {
        return Err(ApiError::bad_request("No file selected"));
    }
    let Some(ext) = extension(&original_name).filter(|ext| state.settings.is_allowed_extension(ext))
    else {
        return Err(ApiError::bad_request("File type not allowed"));
    };
    let filename = secure_filename(&original_name);
    if filename.is_empty() {
        return Err(ApiError::bad_request("Invalid filename"));
    }

    let doc_id = Uuid::new_v4().to_string();
    debug!(%doc_id, %filename, bytes = data.len(), "received upload");

    let chunk_count = process_upload(&state, &doc_id, &filename, &ext, data)
        .await
        .map_err(|e| ApiError::internal("Failed to process document", e))?;

    info!(%doc_id, %filename, chunk_count, "document processed");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "doc_id": doc_id,
            "filename": filename,
            "chunks_created": chunk_count,
            "message": "Document processed and stored successfully",
        })),
    ))
}

/// Find the first field named `file` that carries a filename.
async fn read_file_field(
    multipart: &mut Multipart,
    limit: usize,
) -> Result<Option<(String, Bytes)>, ApiError> {
    let to_api_error = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(format!("File exceeds the maximum upload size of {limit} bytes"))
        } else {
            ApiError::bad_request(e.body_text())
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(to_api_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let data = field.bytes().await.map_err(to_api_error)?;
        return Ok(Some((name, data)));
    }
    Ok(None)
}

/// Persist, load, split, tag and store one upload. The temporary directory
/// is removed when this returns, whatever the outcome.
async fn process_upload(
    state: &AppState,
    doc_id: &str,
    filename: &str,
    ext: &str,
    data: Bytes,
) -> anyhow::Result<usize> {
    let dir = tempfile::Builder::new().prefix("docsearch-").tempdir()?;
    let path = dir.path().join(format!("{doc_id}_{filename}"));
    tokio::fs::write(&path, &data).await?;

    let splitter = state.splitter.clone();
    let ext = ext.to_string();
    let mut chunks: Vec<Segment> = tokio::task::spawn_blocking(move || {
        load_document(&path, &ext).map(|segments| splitter.split_segments(&segments))
    })
    .await??;

    let upload_time = Utc::now().to_rfc3339();
    tag_chunks(&mut chunks, doc_id, filename, &upload_time);
    state.manager.add_segments(&chunks).await?;

    drop(dir);
    Ok(chunks.len())
}

/// `GET /api/documents`
pub async fn list_documents(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let listing = state
        .manager
        .list_documents()
        .await
        .map_err(|e| ApiError::internal("Failed to list documents", e))?;

    Ok(Json(json!({
        "success": true,
        "documents": listing.documents,
        "sample_limit": listing.sample_limit,
        "truncated": listing.truncated,
    })))
}

/// `DELETE /api/documents/{doc_id}`
pub async fn delete_document(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let deleted = state
        .manager
        .delete_document(&doc_id)
        .await
        .map_err(|e| ApiError::internal("Failed to delete document", e))?;

    if !deleted {
        return Err(ApiError::not_found("Document not found"));
    }
    Ok(Json(json!({
        "success": true,
        "message": format!("Document {doc_id} deleted successfully"),
    })))
}

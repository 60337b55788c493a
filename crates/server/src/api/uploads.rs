use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use runninghub_core::MediaKind;

use super::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Name assigned by the remote service. Pass it verbatim to task creation.
    pub file_name: String,
    pub original_name: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
}

/// Strip any directory components a client sent with the file name.
fn base_name(name: &str) -> Option<String> {
    let normalized = name.replace('\\', "/");
    Path::new(&normalized)
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// Stage a file at the remote service.
///
/// Multipart fields: `file` (required) and `type` (`video` or `image`,
/// default `video`).
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut kind = MediaKind::Video;

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                file_name = field.file_name().and_then(base_name);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {}", e)))?;
                data = Some(bytes.to_vec());
            }
            "type" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read type: {}", e)))?;
                if !text.trim().is_empty() {
                    kind = text.parse().map_err(ApiError::BadRequest)?;
                }
            }
            _ => {}
        }
    }

    let data = data.ok_or_else(|| ApiError::bad_request("No file provided"))?;
    let file_name = file_name.ok_or_else(|| ApiError::bad_request("No file selected"))?;
    if !kind.allows(&file_name) {
        return Err(ApiError::bad_request(format!(
            "Unsupported {} file type: {} (allowed: {})",
            kind,
            file_name,
            kind.extensions().join(", ")
        )));
    }

    info!(file = %file_name, kind = %kind, bytes = data.len(), "Uploading file");
    let uploaded = state.api().upload_bytes(data, &file_name, kind).await?;

    Ok(Json(UploadResponse {
        file_name: uploaded.remote_file_name,
        original_name: file_name,
        kind,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("clip.mp4").as_deref(), Some("clip.mp4"));
        assert_eq!(base_name("../../etc/clip.mp4").as_deref(), Some("clip.mp4"));
        assert_eq!(base_name("C:\\Users\\me\\clip.mp4").as_deref(), Some("clip.mp4"));
        assert_eq!(base_name(""), None);
        assert_eq!(base_name("dir/"), Some("dir".to_string()));
    }
}

use crate::config::UploadConfig;
use crate::helper::HelperError;
use crate::middleware::AuthenticatedUser;
use crate::models::Role;
use crate::storage::{mime_to_safe_extension, ManuscriptStore};
use actix_multipart::Multipart;
use actix_web::web::{self, BytesMut};
use futures_util::StreamExt;
use std::sync::Arc;

fn multipart_error(e: actix_multipart::MultipartError) -> HelperError {
    HelperError::Validation(format!("Malformed upload: {}", e))
}

/// Reads the `file` field of a multipart upload, checks its type and size
/// against the upload settings and hands the bytes to the manuscript store.
/// Returns the stored file's URL.
pub async fn save_manuscript_upload(
    store: Arc<dyn ManuscriptStore>,
    uploads: &UploadConfig,
    user: &AuthenticatedUser,
    mut payload: Multipart,
) -> Result<String, HelperError> {
    user.require_role(&[Role::Author, Role::Admin])?;
    let max_bytes = uploads.max_bytes();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(multipart_error)?;
        if field.content_disposition().get_name() != Some("file") {
            continue;
        }

        let content_type = field
            .content_type()
            .map(|m| m.essence_str().to_string())
            .ok_or_else(|| HelperError::Validation("Content-Type not available".to_string()))?;
        if !uploads.allowed_mime_types.iter().any(|m| m == &content_type) {
            return Err(HelperError::Validation(format!(
                "Unsupported file type: '{}'. Please upload a PDF or Word document.",
                content_type
            )));
        }
        if mime_to_safe_extension(&content_type).is_none() {
            log::error!("Allowed upload type '{}' has no safe extension mapping", content_type);
            return Err(HelperError::Validation(format!("Unsupported file type: '{}'", content_type)));
        }

        let mut data = BytesMut::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(multipart_error)?;
            if (data.len() + chunk.len()) as u64 > max_bytes {
                return Err(HelperError::Validation(format!(
                    "File is too large. Maximum size is {}MB.",
                    uploads.max_size_mb
                )));
            }
            data.extend_from_slice(&chunk);
        }
        if data.is_empty() {
            return Err(HelperError::Validation("Uploaded file is empty".to_string()));
        }

        // File system work stays off the async workers.
        let url = web::block(move || store.save(&data, &content_type)).await??;
        log::info!("User {} uploaded manuscript {}", user.id, url);
        return Ok(url);
    }

    Err(HelperError::Validation("No file was uploaded".to_string()))
}

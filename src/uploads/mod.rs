use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(upload_image))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub image_path: String,
}

/// Images only: both the filename extension and the declared content type
/// must agree before the bytes are stored.
fn allowed_image_ext(filename: &str, content_type: &str) -> Option<&'static str> {
    let ext = filename.rsplit('.').next()?.to_ascii_lowercase();
    let ext = match ext.as_str() {
        "jpeg" | "jpg" => "jpg",
        "png" => "png",
        _ => return None,
    };
    match content_type {
        "image/jpeg" | "image/jpg" => (ext == "jpg").then_some("jpg"),
        "image/png" => (ext == "png").then_some("png"),
        _ => None,
    }
}

#[instrument(skip(state, mp))]
pub async fn upload_image(
    State(state): State<AppState>,
    mut mp: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    while let Ok(Some(field)) = mp.next_field().await {
        if field.name() != Some("image") {
            continue;
        }
        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::validation("Error: No file uploaded."))?;
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());

        let Some(ext) = allowed_image_ext(&filename, &content_type) else {
            return Err(AppError::validation("Error: Images only!"));
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        let key = format!("uploads/image-{}.{}", Uuid::new_v4(), ext);
        state.storage.put_object(&key, data, &content_type).await?;

        info!(%key, "image uploaded");
        return Ok(Json(UploadResponse {
            message: "Image uploaded successfully".into(),
            image_path: key,
        }));
    }

    Err(AppError::validation("Error: No file uploaded."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_jpeg_jpg_png_only() {
        assert_eq!(allowed_image_ext("a.jpg", "image/jpeg"), Some("jpg"));
        assert_eq!(allowed_image_ext("a.JPEG", "image/jpeg"), Some("jpg"));
        assert_eq!(allowed_image_ext("a.png", "image/png"), Some("png"));
        assert_eq!(allowed_image_ext("a.gif", "image/gif"), None);
        assert_eq!(allowed_image_ext("a.png", "image/jpeg"), None);
        assert_eq!(allowed_image_ext("a.jpg", "application/octet-stream"), None);
        assert_eq!(allowed_image_ext("noext", "image/png"), None);
    }
}

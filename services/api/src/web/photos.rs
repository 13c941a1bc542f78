//! services/api/src/web/photos.rs
//!
//! Photo upload. Clients upload an image first and put the returned reference
//! into a catch's `photos` list.

use anglerhub_core::validation::ValidationErrors;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::web::state::{AppState, AuthUser};

/// Largest accepted image, in bytes.
pub const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "webp", "heic"];

#[derive(Serialize, ToSchema)]
pub struct PhotoUploadResponse {
    /// Storage reference to use in a catch's `photos`.
    pub path: String,
}

/// POST /photos - Store one uploaded image
///
/// Accepts a multipart/form-data request; the first part with a file name is
/// stored.
#[utoipa::path(
    post,
    path = "/api/photos",
    request_body(content_type = "multipart/form-data", description = "The image to upload."),
    responses(
        (status = 201, description = "Photo stored", body = PhotoUploadResponse),
        (status = 422, description = "Missing file, not an image, or larger than 10 MB")
    )
)]
pub async fn upload_photo_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let invalid = |message: &str| AppError::from(ValidationErrors::single("photo", message));

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error!("Failed to read multipart data: {}", e);
        invalid("The photo upload could not be read.")
    })? {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(|e| {
            error!("Failed to read file bytes: {}", e);
            invalid("The photo upload could not be read.")
        })?;

        if !is_image(&file_name, content_type.as_deref()) {
            return Err(invalid("The photo field must be an image."));
        }
        if data.len() > MAX_PHOTO_BYTES {
            return Err(invalid(
                "The photo field must not be greater than 10240 kilobytes.",
            ));
        }
        if data.is_empty() {
            return Err(invalid("The photo field must not be empty."));
        }

        let path = state.photos.store(auth.user_id, &file_name, data).await?;
        info!("User {} uploaded photo {}", auth.user_id, path);
        return Ok((StatusCode::CREATED, Json(PhotoUploadResponse { path })));
    }

    Err(invalid("The photo field is required."))
}

fn is_image(file_name: &str, content_type: Option<&str>) -> bool {
    let extension_ok = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()));
    let type_ok = content_type.map_or(true, |t| t.starts_with("image/"));
    extension_ok && type_ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("pike.JPG", Some("image/jpeg"), true)]
    #[case("pike.png", None, true)]
    #[case("notes.txt", Some("text/plain"), false)]
    #[case("pike.jpg", Some("application/pdf"), false)]
    #[case("no-extension", Some("image/png"), false)]
    fn image_detection(#[case] name: &str, #[case] content_type: Option<&str>, #[case] ok: bool) {
        assert_eq!(is_image(name, content_type), ok);
    }
}

//! Bound forms for posts and comments.

use axum::extract::Multipart;
use bytes::Bytes;
use serde::Deserialize;
use tracing::warn;

use yatube_types::api::FieldErrors;

use crate::error::{ApiError, ApiResult};
use crate::media::{self, ValidatedImage};
use crate::state::{AppState, with_db};

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";

/// Post form fields exactly as submitted.
#[derive(Debug, Default)]
pub struct RawPostForm {
    pub text: Option<String>,
    pub group: Option<String>,
    pub image: Option<Bytes>,
}

/// A post form that passed validation.
#[derive(Debug)]
pub struct PostForm {
    pub text: String,
    pub group_id: Option<i64>,
    /// `None` when no file was uploaded.
    pub image: Option<ValidatedImage>,
}

impl RawPostForm {
    /// Drain a `multipart/form-data` body. Unknown fields are ignored.
    pub async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = RawPostForm::default();

        loop {
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(e) => {
                    warn!("Malformed multipart body: {}", e);
                    return Err(ApiError::field("__all__", "Malformed form submission."));
                }
            };

            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "text" | "group" => {
                    let value = field
                        .text()
                        .await
                        .map_err(|_| ApiError::field(&name, "Malformed form field."))?;
                    if name == "text" {
                        form.text = Some(value);
                    } else {
                        form.group = Some(value);
                    }
                }
                "image" => {
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|_| ApiError::field("image", media::INVALID_IMAGE))?;
                    // A file input left empty still submits a zero-length part.
                    if !bytes.is_empty() {
                        form.image = Some(bytes);
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }

    /// Validate every field, collecting all errors before giving up.
    pub async fn clean(self, state: &AppState) -> ApiResult<PostForm> {
        let mut errors = FieldErrors::default();

        let text = self.text.as_deref().map(str::trim).unwrap_or_default().to_string();
        if text.is_empty() {
            errors.add("text", REQUIRED);
        }

        let group_id = match self.group.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) => {
                    let exists = with_db(state, move |db| Ok(db.get_group(id)?.is_some())).await?;
                    if !exists {
                        errors.add("group", INVALID_CHOICE);
                    }
                    Some(id)
                }
                Err(_) => {
                    errors.add("group", INVALID_CHOICE);
                    None
                }
            },
        };

        let image = match self.image {
            Some(bytes) => {
                match tokio::task::spawn_blocking(move || media::validate_image(bytes))
                    .await
                    .map_err(|e| ApiError::Internal(anyhow::anyhow!("image check failed: {}", e)))?
                {
                    Ok(image) => Some(image),
                    Err(message) => {
                        errors.add("image", message);
                        None
                    }
                }
            }
            None => None,
        };

        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        Ok(PostForm {
            text,
            group_id,
            image,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: Option<String>,
}

impl CommentForm {
    /// The stripped comment text, or `None` if the form is invalid.
    pub fn clean(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

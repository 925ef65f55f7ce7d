use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;

#[derive(thiserror::Error, Debug)]
pub enum AuthorityError {
    #[error("Preset not found: {0}")]
    PresetNotFound(String),

    #[error("Invalid preset name: {0:?}")]
    InvalidPresetName(String),

    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    #[error("Command not allowed on this channel: {0}")]
    NotAllowed(&'static str),
}

impl AuthorityError {
    pub fn to_status(&self) -> StatusCode {
        match self {
            AuthorityError::PresetNotFound(_) | AuthorityError::LayerNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            AuthorityError::InvalidPresetName(_) => StatusCode::BAD_REQUEST,
            AuthorityError::NotAllowed(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for AuthorityError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "ok": false, "error": self.to_string() });
        (self.to_status(), Json(body)).into_response()
    }
}

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;

use crate::api::v1::response::ApiResponse;
use crate::error::CareerError;

/// `axum::Json` whose rejections use the v1 error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiResponse<()>))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for ApiResponse<()> {
    fn from(rejection: JsonRejection) -> Self {
        map_json_rejection(rejection).into()
    }
}

fn map_json_rejection(rejection: JsonRejection) -> CareerError {
    match rejection {
        JsonRejection::JsonDataError(err) => {
            let message = err.body_text();
            if let Some(field) = extract_missing_field(&message) {
                CareerError::Validation(format!("Missing required field: {field}"))
            } else {
                CareerError::Validation(format!("Invalid JSON: {message}"))
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            CareerError::Validation(format!("JSON syntax error: {}", err.body_text()))
        }
        JsonRejection::MissingJsonContentType(_) => {
            CareerError::Validation("Missing `Content-Type: application/json` header".to_string())
        }
        JsonRejection::BytesRejection(_) => {
            CareerError::Validation("Failed to read request body".to_string())
        }
        _ => CareerError::Validation(rejection.body_text()),
    }
}

fn extract_missing_field(message: &str) -> Option<&str> {
    let prefix = "missing field `";
    let start = message.find(prefix)? + prefix.len();
    let remaining = message.get(start..)?;
    let end = remaining.find('`')?;
    remaining.get(..end)
}

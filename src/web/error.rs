use super::views;
use crate::error::Error;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

pub type AppResult<T> = std::result::Result<T, AppError>;

/// Error side of every handler.
///
/// Form mistakes never reach this type: they are turned into a redirect with
/// a danger flash by the mutation handlers.
#[derive(Debug)]
pub struct AppError(pub Error);

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, title) = match &self.0 {
            Error::NotFound { .. } => (StatusCode::NOT_FOUND, "No encontrado"),
            err if err.is_user_input() => (StatusCode::BAD_REQUEST, "Petición no válida"),
            err => {
                tracing::error!(error = %err, "request failed");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html(views::layout("Error interno", None, "")),
                )
                    .into_response();
            }
        };
        let body = format!("<p>{}</p>", views::escape(&self.0.to_string()));
        (status, Html(views::layout(title, None, &body))).into_response()
    }
}

//! HTTP error types
//!
//! Handlers return [`HttpError`]; its response carries an [`ErrorPage`]
//! marker that [`render_error_pages`] replaces with the matching HTML page.

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use folio_store::StoreError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::media::StorageError;
use crate::render::{RenderError, RenderedPage};
use crate::AppState;

/// Result type for HTTP operations
pub type HttpResult<T> = Result<T, HttpError>;

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Invalid request: {message}")]
    BadRequest { message: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl HttpError {
    pub fn not_found<T: Into<String>>(resource: T) -> Self {
        HttpError::NotFound {
            resource: resource.into(),
        }
    }

    pub fn bad_request<T: Into<String>>(message: T) -> Self {
        HttpError::BadRequest {
            message: message.into(),
        }
    }

    pub fn internal<T: Into<String>>(message: T) -> Self {
        HttpError::Internal {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            HttpError::NotFound { .. } => StatusCode::NOT_FOUND,
            HttpError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            HttpError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            HttpError::Store(_)
            | HttpError::Render(_)
            | HttpError::Storage(_)
            | HttpError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code for consistent reporting
    pub fn error_code(&self) -> &'static str {
        match self {
            HttpError::NotFound { .. } => "RESOURCE_NOT_FOUND",
            HttpError::BadRequest { .. } => "BAD_REQUEST",
            HttpError::Store(e) => e.error_code(),
            HttpError::Render(_) => "RENDER_ERROR",
            HttpError::Storage(_) => "STORAGE_ERROR",
            HttpError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

/// Marker left on error responses so the page renderer can take over
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPage {
    pub status: StatusCode,
    pub code: &'static str,
}

impl ErrorPage {
    /// Template shown for this status
    pub fn template(&self) -> &'static str {
        if self.status == StatusCode::NOT_FOUND {
            "core/404.html"
        } else if self.status.is_client_error() {
            "core/400.html"
        } else {
            "core/500.html"
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("{} ({})", self, self.error_code());
        } else {
            warn!("{} ({})", self, self.error_code());
        }

        let page = ErrorPage {
            status,
            code: self.error_code(),
        };
        let mut response = (status, self.to_string()).into_response();
        response.extensions_mut().insert(page);
        response
    }
}

/// Turn every [`ErrorPage`] response into the rendered HTML page
pub async fn render_error_pages(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let response = next.run(request).await;

    let Some(page) = response.extensions().get::<ErrorPage>().cloned() else {
        return response;
    };

    let template = page.template();
    let context = json!({
        "status": page.status.as_u16(),
        "code": page.code,
        "path": path,
        "viewer": null,
    });

    match state.renderer.render(template, &context) {
        Ok(html) => {
            let (mut parts, _) = response.into_parts();
            parts.headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/html; charset=utf-8"),
            );
            parts.headers.remove(header::CONTENT_LENGTH);
            parts.extensions.insert(RenderedPage {
                template: template.to_string(),
                context,
            });
            Response::from_parts(parts, axum::body::Body::from(html))
        }
        Err(e) => {
            error!("failed to render error page {}: {}", template, e);
            response
        }
    }
}

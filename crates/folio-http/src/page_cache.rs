//! Whole-response cache in front of the post index
//!
//! A cached page is served until its TTL runs out or the cache is flushed;
//! writes elsewhere never invalidate it.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderName, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http_body_util::BodyExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::HttpError;
use crate::AppState;

/// Paths whose responses go through the page cache
pub const CACHED_PATHS: &[&str] = &["/"];

/// Header telling whether a response came from the cache
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// A stored response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPage {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl CachedPage {
    fn into_hit(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        let mut response = (status, Body::from(self.body)).into_response();
        if let Some(value) = self
            .content_type
            .and_then(|ct| HeaderValue::from_str(&ct).ok())
        {
            response.headers_mut().insert(header::CONTENT_TYPE, value);
        }
        response
            .headers_mut()
            .insert(X_CACHE, HeaderValue::from_static("HIT"));
        response
    }
}

/// `page:` followed by the hex blake3 digest of method, path and query
pub fn cache_key(method: &Method, path: &str, query: Option<&str>) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(method.as_str().as_bytes());
    hasher.update(b" ");
    hasher.update(path.as_bytes());
    hasher.update(b"?");
    hasher.update(query.unwrap_or_default().as_bytes());
    format!("page:{}", hex::encode(hasher.finalize().as_bytes()))
}

/// Serve `CACHED_PATHS` from the page cache, storing successful GET responses
pub async fn page_cache(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if request.method() != Method::GET || !CACHED_PATHS.contains(&path.as_str()) {
        return next.run(request).await;
    }

    let key = cache_key(request.method(), &path, request.uri().query());
    match state.page_cache.get::<CachedPage>(&key).await {
        Ok(Some(page)) => {
            debug!("page cache hit for {}", path);
            return page.into_hit();
        }
        Ok(None) => debug!("page cache miss for {}", path),
        Err(e) => warn!("page cache lookup for {} failed: {}", key, e),
    }

    let response = next.run(request).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            return HttpError::internal(format!("failed to read response body: {}", e))
                .into_response()
        }
    };

    let page = CachedPage {
        status: parts.status.as_u16(),
        content_type: parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        body: body.to_vec(),
    };
    if let Err(e) = state.page_cache.put(&key, &page).await {
        warn!("failed to store page {}: {}", path, e);
    }

    parts
        .headers
        .insert(X_CACHE, HeaderValue::from_static("MISS"));
    Response::from_parts(parts, Body::from(body))
}

//! In-process HTTP client for exercising the router in tests
//!
//! Requests go straight through [`tower::ServiceExt::oneshot`]; no socket is
//! opened. Responses keep the [`RenderedPage`] extension so tests can check
//! which template was used and what context it received.

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use folio_store::{StoreResult, User};
use http_body_util::BodyExt;
use serde_json::Value;
use thiserror::Error;
use tower::ServiceExt;

use crate::auth::SESSION_COOKIE;
use crate::render::RenderedPage;
use crate::{build_router, AppState};

const BOUNDARY: &str = "folio-test-boundary";

#[derive(Error, Debug)]
pub enum TestError {
    #[error("Invalid request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("Failed to read body: {0}")]
    Body(String),

    #[error("Form encoding failed: {0}")]
    Encoding(#[from] serde_urlencoded::ser::Error),
}

pub type TestResult<T> = Result<T, TestError>;

/// HTTP test client bound to one application instance
#[derive(Clone)]
pub struct TestClient {
    state: AppState,
    router: Router,
    session: Option<String>,
}

impl TestClient {
    pub fn new(state: AppState) -> Self {
        Self {
            router: build_router(state.clone()),
            state,
            session: None,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Send requests with an existing session token
    pub fn with_session(mut self, token: impl Into<String>) -> Self {
        self.session = Some(token.into());
        self
    }

    /// A client signed in as `user`, sharing this client's application
    pub async fn force_login(&self, user: &User) -> StoreResult<Self> {
        let token = self.state.store.create_session(user.id).await?;
        Ok(self.clone().with_session(token))
    }

    pub fn get(&self, path: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(self, Method::GET, path.into())
    }

    pub fn post(&self, path: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(self, Method::POST, path.into())
    }
}

/// A file part for [`RequestBuilder::multipart`]
#[derive(Debug, Clone)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl FilePart {
    pub fn new(
        field: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            field: field.into(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// [`SMALL_GIF`] under the `image` field
    pub fn gif(file_name: impl Into<String>) -> Self {
        Self::new("image", file_name, "image/gif", SMALL_GIF)
    }
}

/// Request builder for fluent API
pub struct RequestBuilder {
    router: Router,
    method: Method,
    path: String,
    session: Option<String>,
    content_type: Option<String>,
    body: TestResult<Vec<u8>>,
}

impl RequestBuilder {
    fn new(client: &TestClient, method: Method, path: String) -> Self {
        Self {
            router: client.router.clone(),
            method,
            path,
            session: client.session.clone(),
            content_type: None,
            body: Ok(Vec::new()),
        }
    }

    /// Urlencoded form body
    pub fn form(mut self, fields: &[(&str, &str)]) -> Self {
        self.content_type = Some("application/x-www-form-urlencoded".to_string());
        self.body = serde_urlencoded::to_string(fields)
            .map(String::into_bytes)
            .map_err(TestError::from);
        self
    }

    /// `multipart/form-data` body with text fields and file parts
    pub fn multipart(mut self, fields: &[(&str, &str)], files: &[FilePart]) -> Self {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY, name, value
                )
                .as_bytes(),
            );
        }
        for file in files {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    BOUNDARY, file.field, file.file_name, file.content_type
                )
                .as_bytes(),
            );
            body.extend_from_slice(&file.data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        self.content_type = Some(format!("multipart/form-data; boundary={}", BOUNDARY));
        self.body = Ok(body);
        self
    }

    pub async fn send(self) -> TestResult<TestResponse> {
        let mut request = Request::builder().method(self.method).uri(self.path.as_str());
        if let Some(token) = &self.session {
            request = request.header(header::COOKIE, format!("{}={}", SESSION_COOKIE, token));
        }
        if let Some(content_type) = &self.content_type {
            request = request.header(header::CONTENT_TYPE, content_type.as_str());
        }
        let request = request.body(Body::from(self.body?))?;

        let response = match self.router.oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        let rendered = response.extensions().get::<RenderedPage>().cloned();
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| TestError::Body(e.to_string()))?
            .to_bytes();

        Ok(TestResponse {
            status: parts.status,
            headers: parts.headers,
            body,
            rendered,
        })
    }
}

/// Test response wrapper with assertion methods
#[derive(Debug, Clone)]
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    rendered: Option<RenderedPage>,
}

impl TestResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Template rendered for this response, if any
    pub fn template(&self) -> Option<&str> {
        self.rendered.as_ref().map(|page| page.template.as_str())
    }

    /// Context the template was rendered with
    pub fn context(&self) -> &Value {
        match &self.rendered {
            Some(page) => &page.context,
            None => panic!("Response to this request was not rendered from a template"),
        }
    }

    /// Assert the response status code
    pub fn assert_status(self, expected: StatusCode) -> Self {
        if self.status != expected {
            panic!(
                "Expected status {}, got {} with body: {}",
                expected,
                self.status,
                self.text()
            );
        }
        self
    }

    /// Assert a `302 Found` to exactly `location`
    pub fn assert_redirects(self, location: &str) -> Self {
        let response = self.assert_status(StatusCode::FOUND);
        match response.header("location") {
            Some(actual) if actual == location => {}
            Some(actual) => panic!("Expected redirect to '{}', got '{}'", location, actual),
            None => panic!("Expected redirect to '{}', no Location header", location),
        }
        response
    }

    pub fn assert_template(self, expected: &str) -> Self {
        match self.template() {
            Some(actual) if actual == expected => {}
            Some(actual) => panic!("Expected template '{}', got '{}'", expected, actual),
            None => panic!("Expected template '{}', nothing was rendered", expected),
        }
        self
    }

    pub fn assert_header(self, name: &str, expected: &str) -> Self {
        match self.header(name) {
            Some(actual) if actual == expected => {}
            Some(actual) => panic!(
                "Expected header '{}' to be '{}', got '{}'",
                name, expected, actual
            ),
            None => panic!("Expected header '{}' not found", name),
        }
        self
    }

    pub fn assert_body_contains(self, needle: &str) -> Self {
        if !self.text().contains(needle) {
            panic!("Expected body to contain '{}'", needle);
        }
        self
    }
}

/// 2x1 GIF used by upload tests
pub const SMALL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00,
    0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00, 0x00, 0x00,
    0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
];

//! Who is asking: session resolution and login redirects
//!
//! Sessions are issued by the authentication subsystem; this module only
//! reads the `sessionid` cookie and maps it to a [`Viewer`].

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, Uri};
use axum::middleware::Next;
use axum::response::Response;
use folio_store::{Store, User, UserId, Viewer};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::routes::Found;
use crate::AppState;

/// Cookie holding the session token
pub const SESSION_COOKIE: &str = "sessionid";

/// Login page anonymous visitors are sent to
pub const LOGIN_URL: &str = "/auth/login/";

/// The resolved requester, available to every handler
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentViewer {
    pub viewer: Viewer,
    pub user: Option<User>,
}

impl CurrentViewer {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user: User) -> Self {
        Self {
            viewer: Viewer::Authenticated(user.id),
            user: Some(user),
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.viewer.user_id()
    }

    /// The viewer as a template sees it: `{id, username}` or null
    pub fn context(&self) -> Value {
        match &self.user {
            Some(user) => json!({ "id": user.id, "username": user.username }),
            None => Value::Null,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentViewer
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<CurrentViewer>()
            .cloned()
            .unwrap_or_default())
    }
}

/// An authenticated requester; anonymous requests are redirected to the login page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequireUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = Found;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts
            .extensions
            .get::<CurrentViewer>()
            .and_then(|current| current.user.clone())
        {
            Some(user) => Ok(RequireUser(user)),
            None => Err(login_redirect(&parts.uri)),
        }
    }
}

/// `/auth/login/?next=<original path and query>`
pub fn login_url(uri: &Uri) -> String {
    let next = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("{}?next={}", LOGIN_URL, encoded.replace("%2F", "/"))
}

pub fn login_redirect(uri: &Uri) -> Found {
    Found::to(login_url(uri))
}

/// Value of the session cookie, if the request carries one
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

async fn resolve(store: &dyn Store, token: &str) -> Option<User> {
    let user_id = match store.session_user(token).await {
        Ok(Some(user_id)) => user_id,
        Ok(None) => {
            debug!("unknown session token");
            return None;
        }
        Err(e) => {
            warn!("session lookup failed: {}", e);
            return None;
        }
    };
    match store.user_by_id(user_id).await {
        Ok(user) => user,
        Err(e) => {
            warn!("user lookup for session failed: {}", e);
            None
        }
    }
}

/// Middleware attaching a [`CurrentViewer`] to every request.
/// Missing, unknown or unresolvable sessions are anonymous.
pub async fn resolve_viewer(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let current = match session_token(request.headers()) {
        Some(token) => match resolve(state.store.as_ref(), &token).await {
            Some(user) => CurrentViewer::authenticated(user),
            None => CurrentViewer::anonymous(),
        },
        None => CurrentViewer::anonymous(),
    };
    request.extensions_mut().insert(current);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_login_url_keeps_path_readable() {
        let uri: Uri = "/create/".parse().unwrap();
        assert_eq!(login_url(&uri), "/auth/login/?next=/create/");

        let uri: Uri = "/posts/1/edit/".parse().unwrap();
        assert_eq!(login_url(&uri), "/auth/login/?next=/posts/1/edit/");

        let uri: Uri = "/follow/?page=2".parse().unwrap();
        assert_eq!(login_url(&uri), "/auth/login/?next=/follow/%3Fpage%3D2");
    }

    #[test]
    fn test_session_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; sessionid=abc123; lang=en"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));

        headers.insert(header::COOKIE, HeaderValue::from_static("sessionid="));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn test_viewer_context() {
        assert_eq!(CurrentViewer::anonymous().context(), Value::Null);
        let current = CurrentViewer::authenticated(User {
            id: UserId(5),
            username: "leo".to_string(),
        });
        assert_eq!(current.context()["username"], "leo");
        assert_eq!(current.user_id(), Some(UserId(5)));
    }
}

//! Authenticated HTTP client for the MyMentor REST API.
//!
//! Every response passes through the session guard before application code
//! sees it:
//! - 401 on an authenticated call → session teardown + `SessionExpired`
//! - no response at all → session teardown + `Connectivity`
//! - request never left the client → session teardown + `RequestSetup`
//! - 404 on the advice-listing lookup → substituted empty-list success
//! - any other non-2xx → `Http { status, message }`, session untouched
//!
//! Centralizing teardown here guarantees stale credentials are never
//! retried indefinitely: one distinguishing code path per failure class.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::models::{
    AdviceListResponse, AdviceRequest, AdviceResponse, AreasResponse, LoginResponse,
    NewProfessional, NewUser, Page, Professional, ProfessionalUpdate, RefreshResponse,
    UserResponse, UserUpdate, UsersResponse,
};
use crate::session::Session;

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Arc<Session>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, session: Arc<Session>) -> Result<Self, ApiError> {
        Self::build(
            &config.base_url,
            Duration::from_secs(config.timeout_seconds),
            session,
        )
    }

    /// Create a client with a custom base URL (for testing / integration).
    pub fn with_base_url(base_url: &str, session: Arc<Session>) -> Result<Self, ApiError> {
        Self::build(base_url, Duration::from_secs(5), session)
    }

    fn build(base_url: &str, timeout: Duration, session: Arc<Session>) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::RequestSetup(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    // ========================================================================
    // Transport + session guard
    // ========================================================================

    /// Send one request. No retries at this layer; the one-shot refresh in
    /// the session store is the only retry-shaped behavior in the client.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        attach_token: bool,
    ) -> Result<Response, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.request(method, &url);

        // The persisted token is re-read on every outbound call.
        let token = if attach_token {
            self.session.token()
        } else {
            None
        };
        let authenticated = token.is_some();
        if let Some(t) = token {
            req = req.header(AUTHORIZATION, format!("Bearer {t}"));
        }
        if let Some(b) = body {
            req = req.json(&b);
        }

        let resp = match req.send().await {
            Ok(r) => r,
            Err(e) if e.is_builder() => {
                self.session.teardown();
                return Err(ApiError::RequestSetup(e.to_string()));
            }
            Err(e) => {
                // Timeouts land here too: no response is a transport failure.
                self.session.teardown();
                return Err(ApiError::Connectivity(e.to_string()));
            }
        };

        if resp.status() == StatusCode::UNAUTHORIZED && authenticated {
            // One-shot guard: no refresh-and-replay here. The refresh loop
            // keeps tokens fresh, so a 401 means the session is gone.
            tracing::warn!(path, "401 on authenticated call, tearing down session");
            self.session.teardown();
            return Err(ApiError::SessionExpired);
        }

        Ok(resp)
    }

    fn to_body<T: Serialize>(&self, value: &T) -> Result<serde_json::Value, ApiError> {
        serde_json::to_value(value).map_err(|e| {
            self.session.teardown();
            ApiError::RequestSetup(e.to_string())
        })
    }

    // ========================================================================
    // Auth endpoints
    // ========================================================================

    /// `POST /login`. Sent without a bearer token: a 401 here means bad
    /// credentials, not an expired session, and must not tear anything down.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = json!({ "email": email, "password": password });
        let resp = self.execute(Method::POST, "/login", Some(body), false).await?;
        decode(resp).await
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        let resp = self.execute(Method::POST, "/logout", None, true).await?;
        expect_success(resp).await
    }

    pub async fn refresh_token(&self) -> Result<RefreshResponse, ApiError> {
        let resp = self
            .execute(Method::POST, "/refresh-token", None, true)
            .await?;
        decode(resp).await
    }

    // ========================================================================
    // User endpoints
    // ========================================================================

    pub async fn get_user_by_email(&self, email: &str) -> Result<UserResponse, ApiError> {
        let resp = self
            .execute(Method::GET, &format!("/users/email/{email}"), None, true)
            .await?;
        decode(resp).await
    }

    pub async fn get_users(&self) -> Result<UsersResponse, ApiError> {
        let resp = self.execute(Method::GET, "/users", None, true).await?;
        decode(resp).await
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<UserResponse, ApiError> {
        let body = self.to_body(user)?;
        let resp = self
            .execute(Method::POST, "/users", Some(body), true)
            .await?;
        decode(resp).await
    }

    pub async fn update_user(&self, uuid: Uuid, update: &UserUpdate) -> Result<UserResponse, ApiError> {
        let body = self.to_body(update)?;
        let resp = self
            .execute(Method::PUT, &format!("/users/{uuid}"), Some(body), true)
            .await?;
        decode(resp).await
    }

    pub async fn delete_user(&self, uuid: Uuid) -> Result<(), ApiError> {
        let resp = self
            .execute(Method::DELETE, &format!("/users/{uuid}"), None, true)
            .await?;
        expect_success(resp).await
    }

    // ========================================================================
    // Professional / area endpoints
    // ========================================================================

    pub async fn get_professionals_page(
        &self,
        page: u32,
        size: u32,
    ) -> Result<Page<Professional>, ApiError> {
        let resp = self
            .execute(
                Method::GET,
                &format!("/professionals/page/{page}?size={size}"),
                None,
                true,
            )
            .await?;
        decode(resp).await
    }

    pub async fn get_areas(&self) -> Result<AreasResponse, ApiError> {
        let resp = self.execute(Method::GET, "/areas", None, true).await?;
        decode(resp).await
    }

    pub async fn create_professional(
        &self,
        professional: &NewProfessional,
    ) -> Result<Professional, ApiError> {
        let body = self.to_body(professional)?;
        let resp = self
            .execute(Method::POST, "/professional", Some(body), true)
            .await?;
        decode(resp).await
    }

    pub async fn update_professional(
        &self,
        id: i64,
        update: &ProfessionalUpdate,
    ) -> Result<Professional, ApiError> {
        let body = self.to_body(update)?;
        let resp = self
            .execute(Method::PUT, &format!("/professional/{id}"), Some(body), true)
            .await?;
        decode(resp).await
    }

    pub async fn delete_professional(&self, id: i64) -> Result<(), ApiError> {
        let resp = self
            .execute(Method::DELETE, &format!("/professional/{id}"), None, true)
            .await?;
        expect_success(resp).await
    }

    // ========================================================================
    // Advice endpoints
    // ========================================================================

    /// List the advice threads of one advisor assignment. A 404 means the
    /// advisor simply has no threads yet and is substituted with an empty
    /// listing instead of an error.
    pub async fn get_advisorys(&self, asesor_id: i64) -> Result<AdviceListResponse, ApiError> {
        let resp = self
            .execute(
                Method::GET,
                &format!("/gpt/professional/{asesor_id}"),
                None,
                true,
            )
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(AdviceListResponse::empty());
        }
        decode(resp).await
    }

    pub async fn create_advice(&self, request: &AdviceRequest) -> Result<AdviceResponse, ApiError> {
        let body = self.to_body(request)?;
        let resp = self
            .execute(Method::POST, "/gpt/professional/advice", Some(body), true)
            .await?;
        decode(resp).await
    }

    pub async fn update_advice(
        &self,
        id: i64,
        request: &AdviceRequest,
    ) -> Result<AdviceResponse, ApiError> {
        let body = self.to_body(request)?;
        let resp = self
            .execute(
                Method::PUT,
                &format!("/gpt/professional/advice/{id}"),
                Some(body),
                true,
            )
            .await?;
        decode(resp).await
    }

    pub async fn get_advice(&self, id: i64) -> Result<AdviceResponse, ApiError> {
        let resp = self
            .execute(
                Method::GET,
                &format!("/gpt/professional/advice/{id}"),
                None,
                true,
            )
            .await?;
        decode(resp).await
    }

    pub async fn delete_advice(&self, id: i64) -> Result<(), ApiError> {
        let resp = self
            .execute(
                Method::DELETE,
                &format!("/gpt/professional/advice/{id}"),
                None,
                true,
            )
            .await?;
        expect_success(resp).await
    }
}

// ============================================================================
// Response decoding
// ============================================================================

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(http_error(status, resp).await);
    }
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| ApiError::Connectivity(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

async fn expect_success(resp: Response) -> Result<(), ApiError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(http_error(status, resp).await);
    }
    Ok(())
}

/// Build an `Http` error, pulling the human message out of the body when the
/// backend sent one (`mensaje` on this API; `message`/`error` as fallbacks).
async fn http_error(status: StatusCode, resp: Response) -> ApiError {
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            ["mensaje", "message", "error"]
                .iter()
                .find_map(|k| v.get(k).and_then(|m| m.as_str()).map(String::from))
        })
        .unwrap_or(body);

    ApiError::Http {
        status: status.as_u16(),
        message,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryCredentialStore;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn authed_session() -> Arc<Session> {
        Arc::new(Session::new(Box::new(MemoryCredentialStore::with(
            "test-token",
            "ana@example.com",
        ))))
    }

    fn anonymous_session() -> Arc<Session> {
        Arc::new(Session::new(Box::new(MemoryCredentialStore::default())))
    }

    #[tokio::test]
    async fn attaches_bearer_token_from_persisted_credentials() {
        let server = MockServer::start().await;
        let session = authed_session();
        let client = ApiClient::with_base_url(&server.uri(), session).unwrap();

        Mock::given(method("GET"))
            .and(path("/areas"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "areas": [{ "id": 1, "name": "Tecnología" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let areas = client.get_areas().await.unwrap();
        assert_eq!(areas.areas.len(), 1);
        assert_eq!(areas.areas[0].name, "Tecnología");
    }

    #[tokio::test]
    async fn unauthorized_on_authenticated_call_tears_down_session() {
        let server = MockServer::start().await;
        let session = authed_session();
        let client = ApiClient::with_base_url(&server.uri(), session.clone()).unwrap();

        Mock::given(method("GET"))
            .and(path("/users"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client.get_users().await.unwrap_err();
        assert!(matches!(err, ApiError::SessionExpired));
        assert!(session.token().is_none(), "token must be cleared");
        assert!(session.email().is_none(), "email must be cleared");
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn unauthorized_login_is_not_a_session_teardown() {
        let server = MockServer::start().await;
        let session = authed_session();
        let client = ApiClient::with_base_url(&server.uri(), session.clone()).unwrap();

        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "mensaje": "Credenciales inválidas"
            })))
            .mount(&server)
            .await;

        let err = client.login("ana@example.com", "wrong").await.unwrap_err();
        match err {
            ApiError::Http { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Credenciales inválidas");
            }
            other => panic!("expected Http(401), got {other:?}"),
        }
        // Existing credentials survive a failed re-login attempt.
        assert!(session.token().is_some());
    }

    #[tokio::test]
    async fn advice_listing_404_is_substituted_with_empty_list() {
        let server = MockServer::start().await;
        let session = authed_session();
        let client = ApiClient::with_base_url(&server.uri(), session.clone()).unwrap();

        Mock::given(method("GET"))
            .and(path("/gpt/professional/42"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let listing = client.get_advisorys(42).await.unwrap();
        assert!(listing.advisorys.is_empty());
        assert!(!listing.mensaje.is_empty());
        // The suppressed 404 is a steady state, not a session event.
        assert!(session.token().is_some());
    }

    #[tokio::test]
    async fn other_http_errors_propagate_without_teardown() {
        let server = MockServer::start().await;
        let session = authed_session();
        let client = ApiClient::with_base_url(&server.uri(), session.clone()).unwrap();

        Mock::given(method("GET"))
            .and(path("/users"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "mensaje": "Error interno"
            })))
            .mount(&server)
            .await;

        let err = client.get_users().await.unwrap_err();
        match err {
            ApiError::Http { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "Error interno");
            }
            other => panic!("expected Http(500), got {other:?}"),
        }
        assert!(session.token().is_some(), "500 must not clear credentials");
    }

    #[tokio::test]
    async fn transport_failure_tears_down_session() {
        // Nothing listens on this port; the connect fails immediately.
        let session = authed_session();
        let client = ApiClient::with_base_url("http://127.0.0.1:9", session.clone()).unwrap();

        let err = client.get_users().await.unwrap_err();
        assert!(matches!(err, ApiError::Connectivity(_)), "got {err:?}");
        assert!(session.token().is_none());
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn anonymous_requests_carry_no_bearer_header() {
        let server = MockServer::start().await;
        let session = anonymous_session();
        let client = ApiClient::with_base_url(&server.uri(), session).unwrap();

        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": "ok",
                "email": "ana@example.com",
                "token": "fresh-token"
            })))
            .mount(&server)
            .await;

        let resp = client.login("ana@example.com", "secret123").await.unwrap();
        assert_eq!(resp.token, "fresh-token");

        let received = server.received_requests().await.unwrap();
        assert!(received
            .iter()
            .all(|r| r.headers.get("authorization").is_none()));
    }
}

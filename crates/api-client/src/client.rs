use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use brokerdesk_api::*;

/// Errors surfaced by [`ApiClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Non-2xx response; `detail` is the server's `{"detail": ...}` text.
    #[error("HTTP {status}: {detail}")]
    Http { status: u16, detail: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("not logged in")]
    NotAuthenticated,
    #[error("another request is still in progress")]
    Busy,
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The session is gone: either the server said 401 or there never was one.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::NotAuthenticated) || self.status() == Some(401)
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Typed HTTP client for the broker portfolio API.
///
/// High-level methods use the stored session token; the `*_with_auth`
/// methods take a token per call for tests that juggle several brokers.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    session_token: Option<String>,
}

impl ApiClient {
    /// Create a new client with the given base URL and timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create from an existing `reqwest::Client` (e.g. shared in tests).
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session_token: None,
        }
    }

    pub fn set_auth(&mut self, token: String) {
        self.session_token = Some(token);
    }

    pub fn clear_auth(&mut self) {
        self.session_token = None;
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn token(&self) -> Result<&str> {
        self.session_token
            .as_deref()
            .ok_or(ClientError::NotAuthenticated)
    }

    // ── Health ────────────────────────────────────────────────────────────

    pub async fn health(&self) -> Result<HealthResponse> {
        let resp = self.client.get(self.url("/health")).send().await?;
        parse_response(resp).await
    }

    // ── Auth ──────────────────────────────────────────────────────────────

    pub async fn register(&self, req: &RegisterRequest) -> Result<UserRead> {
        let resp = self
            .client
            .post(self.url("/auth/register"))
            .json(req)
            .send()
            .await?;
        parse_response(resp).await
    }

    /// Log in with form-encoded credentials. Does not store the token; call
    /// [`ApiClient::set_auth`] with `access_token` to use it.
    pub async fn login(&self, form: &LoginForm) -> Result<LoginResponse> {
        let resp = self
            .client
            .post(self.url("/auth/login"))
            .form(form)
            .send()
            .await?;
        parse_response(resp).await
    }

    pub async fn logout(&self) -> Result<DetailResponse> {
        let token = self.token()?;
        let resp = self
            .client
            .post(self.url("/auth/logout"))
            .header(SESSION_HEADER, token)
            .send()
            .await?;
        parse_response(resp).await
    }

    pub async fn me(&self) -> Result<UserRead> {
        let token = self.token()?;
        let resp = self
            .client
            .get(self.url("/auth/me"))
            .header(SESSION_HEADER, token)
            .send()
            .await?;
        parse_response(resp).await
    }

    // ── Properties ────────────────────────────────────────────────────────

    /// List properties. The session token is sent when one is set so that
    /// `only_mine` listings work.
    pub async fn list_properties(&self, query: &PropertyListQuery) -> Result<Vec<PropertyRead>> {
        let mut url = self.url("/properties/");
        let qs = query.to_query_string();
        if !qs.is_empty() {
            url = format!("{url}?{qs}");
        }

        let mut req = self.client.get(&url);
        if let Some(token) = self.auth_token() {
            req = req.header(SESSION_HEADER, token);
        }
        parse_response(req.send().await?).await
    }

    pub async fn get_property(&self, id: i64) -> Result<PropertyRead> {
        let resp = self
            .client
            .get(self.url(&format!("/properties/{id}")))
            .send()
            .await?;
        parse_response(resp).await
    }

    pub async fn create_property(&self, req: &PropertyCreate) -> Result<PropertyRead> {
        let token = self.token()?;
        let resp = self.post_json_with_auth("/properties/", token, req).await?;
        parse_response(resp).await
    }

    pub async fn update_property(&self, id: i64, req: &PropertyUpdate) -> Result<PropertyRead> {
        let token = self.token()?;
        let resp = self
            .put_json_with_auth(&format!("/properties/{id}"), token, req)
            .await?;
        parse_response(resp).await
    }

    pub async fn delete_property(&self, id: i64) -> Result<()> {
        let token = self.token()?;
        let resp = self
            .delete_with_auth(&format!("/properties/{id}"), token)
            .await?;
        expect_success(resp).await
    }

    // ── Agents ────────────────────────────────────────────────────────────

    pub async fn list_agents(&self, query: &AgentListQuery) -> Result<Vec<AgentRead>> {
        let url = self.url(&format!(
            "/agents/?skip={}&limit={}",
            query.skip, query.limit
        ));
        let resp = self.client.get(&url).send().await?;
        parse_response(resp).await
    }

    pub async fn get_agent(&self, slug: &str) -> Result<AgentRead> {
        let resp = self
            .client
            .get(self.url(&format!("/agents/{}", urlencoding::encode(slug))))
            .send()
            .await?;
        parse_response(resp).await
    }

    /// Public landing-page sign-up (form-encoded).
    pub async fn register_agent(&self, form: &AgentSignupForm) -> Result<AgentSignupResponse> {
        let resp = self
            .client
            .post(self.url("/agents/register"))
            .form(form)
            .send()
            .await?;
        parse_response(resp).await
    }

    pub async fn create_agent(&self, admin_key: &str, req: &AgentCreate) -> Result<AgentRead> {
        let resp = self
            .client
            .post(self.url("/agents/"))
            .header(ADMIN_KEY_HEADER, admin_key)
            .json(req)
            .send()
            .await?;
        parse_response(resp).await
    }

    pub async fn update_agent(
        &self,
        admin_key: &str,
        slug: &str,
        req: &AgentCreate,
    ) -> Result<AgentRead> {
        let resp = self
            .client
            .put(self.url(&format!("/agents/{}", urlencoding::encode(slug))))
            .header(ADMIN_KEY_HEADER, admin_key)
            .json(req)
            .send()
            .await?;
        parse_response(resp).await
    }

    pub async fn delete_agent(&self, admin_key: &str, slug: &str) -> Result<DetailResponse> {
        let resp = self
            .client
            .delete(self.url(&format!("/agents/{}", urlencoding::encode(slug))))
            .header(ADMIN_KEY_HEADER, admin_key)
            .send()
            .await?;
        parse_response(resp).await
    }

    // ── Raw helpers (for E2E / advanced usage) ────────────────────────────

    /// Unauthenticated GET returning the raw response.
    pub async fn get_raw(&self, path: &str) -> Result<reqwest::Response> {
        Ok(self.client.get(self.url(path)).send().await?)
    }

    /// Authenticated GET returning the raw response.
    pub async fn get_with_auth(&self, path: &str, token: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .get(self.url(path))
            .header(SESSION_HEADER, token)
            .send()
            .await?)
    }

    /// Authenticated POST (no body) returning the raw response.
    pub async fn post_with_auth(&self, path: &str, token: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.url(path))
            .header(SESSION_HEADER, token)
            .send()
            .await?)
    }

    /// Authenticated POST with JSON body returning the raw response.
    pub async fn post_json_with_auth<T: Serialize + ?Sized>(
        &self,
        path: &str,
        token: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.url(path))
            .header(SESSION_HEADER, token)
            .json(body)
            .send()
            .await?)
    }

    /// Authenticated PUT with JSON body returning the raw response.
    pub async fn put_json_with_auth<T: Serialize + ?Sized>(
        &self,
        path: &str,
        token: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        Ok(self
            .client
            .put(self.url(path))
            .header(SESSION_HEADER, token)
            .json(body)
            .send()
            .await?)
    }

    /// Authenticated DELETE returning the raw response.
    pub async fn delete_with_auth(&self, path: &str, token: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .delete(self.url(path))
            .header(SESSION_HEADER, token)
            .send()
            .await?)
    }

    /// Unauthenticated POST with JSON body returning the raw response.
    pub async fn post_json_raw<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        Ok(self.client.post(self.url(path)).json(body).send().await?)
    }

    /// Unauthenticated form POST returning the raw response.
    pub async fn post_form_raw<T: Serialize + ?Sized>(
        &self,
        path: &str,
        form: &T,
    ) -> Result<reqwest::Response> {
        Ok(self.client.post(self.url(path)).form(form).send().await?)
    }
}

/// Turn a non-2xx response into [`ClientError::Http`], preferring the
/// server's `detail` field over the raw body.
async fn error_from(resp: reqwest::Response) -> ClientError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ApiError>(&body)
        .map(|e| e.detail)
        .unwrap_or(body);
    ClientError::Http { status, detail }
}

/// Parse an HTTP response: return the deserialized body on 2xx,
/// or an error carrying the status and detail text.
async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    if !resp.status().is_success() {
        return Err(error_from(resp).await);
    }
    Ok(resp.json().await?)
}

/// Like [`parse_response`] for endpoints that answer without a body.
async fn expect_success(resp: reqwest::Response) -> Result<()> {
    if !resp.status().is_success() {
        return Err(error_from(resp).await);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve a single canned HTTP response and hand back the request head.
    async fn one_shot_server(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap();
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&buf[..n]).into_owned()
        });
        (format!("http://{addr}"), handle)
    }

    #[tokio::test]
    async fn error_detail_is_extracted() {
        let (base, server) =
            one_shot_server("403 Forbidden", r#"{"detail":"premium access required"}"#).await;
        let client = ApiClient::new(&base, Duration::from_secs(5)).unwrap();
        let err = client
            .login(&LoginForm {
                email: "broker@example.com".into(),
                password: "StrongPass123".into(),
            })
            .await
            .unwrap_err();
        match err {
            ClientError::Http { status, detail } => {
                assert_eq!(status, 403);
                assert_eq!(detail, "premium access required");
            }
            other => panic!("unexpected error: {other}"),
        }
        let request = server.await.unwrap();
        assert!(request.starts_with("POST /auth/login"));
        assert!(request.contains("application/x-www-form-urlencoded"));
    }

    #[tokio::test]
    async fn session_header_is_sent() {
        let (base, server) = one_shot_server("200 OK", "[]").await;
        let mut client = ApiClient::new(&base, Duration::from_secs(5)).unwrap();
        client.set_auth("tok-123".into());
        let rows = client.list_properties(&PropertyListQuery::mine()).await.unwrap();
        assert!(rows.is_empty());

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /properties/?only_mine=true"));
        assert!(request.contains("x-session-token: tok-123"));
    }

    #[tokio::test]
    async fn missing_token_fails_before_sending() {
        let client = ApiClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let err = client.me().await.unwrap_err();
        assert!(matches!(err, ClientError::NotAuthenticated));
        assert!(err.is_unauthorized());
    }
}

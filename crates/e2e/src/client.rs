use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use uuid::Uuid;

use brokerdesk_api::{AgentCreate, AgentRead, LoginForm, LoginResponse, RegisterRequest, UserRead};
use brokerdesk_api_client::ApiClient;
use brokerdesk_server::{AppConfig, AppState, storage};

use crate::fixtures;

/// A server running in-process on an ephemeral port, plus its data dir.
pub struct TestContext {
    pub api: ApiClient,
    pub admin_key: String,
    server: JoinHandle<()>,
    _data_dir: TempDir,
}

/// A registered broker with credentials and a live session token.
#[derive(Debug, Clone)]
pub struct TestBroker {
    pub user: UserRead,
    pub agent: AgentRead,
    pub email: String,
    pub password: String,
    pub token: String,
}

impl TestContext {
    /// Start a server with default settings and a random admin key.
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(|_| {}).await
    }

    /// Start a server, letting the caller adjust the config first.
    pub async fn spawn_with(configure: impl FnOnce(&mut AppConfig)) -> Result<Self> {
        let data_dir = tempfile::tempdir().context("creating temp data dir")?;
        let admin_key = format!("e2e-admin-{}", Uuid::new_v4().simple());

        let mut config = AppConfig {
            data_dir: data_dir.path().to_path_buf(),
            port: 0,
            admin_key: Some(admin_key.clone()),
            ..AppConfig::default()
        };
        configure(&mut config);

        let db = storage::init_db(&config.data_dir)?;
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = AppState::new(db, config);
        let server = tokio::spawn(async move {
            if let Err(e) = brokerdesk_server::serve_on(listener, state).await {
                tracing::error!("e2e server stopped: {e:#}");
            }
        });

        Ok(Self {
            api: ApiClient::with_client(reqwest::Client::new(), &format!("http://{addr}")),
            admin_key,
            server,
            _data_dir: data_dir,
        })
    }

    /// Build a full URL from a path like `/health`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api.base_url(), path)
    }

    pub fn http(&self) -> reqwest::Client {
        reqwest::Client::new()
    }

    /// Create an agent through the admin route with a unique email and slug.
    pub async fn create_agent(&self, premium: bool) -> Result<AgentRead> {
        let req = fixtures::agent(&format!("agent-{}@e2e.local", Uuid::new_v4()), premium);
        Ok(self.api.create_agent(&self.admin_key, &req).await?)
    }

    /// Flip an agent's premium flag via a full admin update.
    pub async fn set_premium(&self, agent: &AgentRead, premium: bool) -> Result<AgentRead> {
        let req = AgentCreate {
            name: agent.name.clone(),
            email: agent.email.clone(),
            phone: agent.phone.clone(),
            company: agent.company.clone(),
            experience: agent.experience.clone(),
            profile_photo_url: agent.profile_photo_url.clone(),
            city: agent.city.clone(),
            happy_customers: agent.happy_customers,
            successful_sales: agent.successful_sales,
            instagram_url: agent.instagram_url.clone(),
            facebook_url: agent.facebook_url.clone(),
            slug: Some(agent.slug.clone()),
            is_premium: premium,
        };
        Ok(self
            .api
            .update_agent(&self.admin_key, &agent.slug, &req)
            .await?)
    }

    /// Register a broker account for `agent` (raw response, for status checks).
    pub async fn register_raw(&self, email: &str, password: &str) -> Result<reqwest::Response> {
        Ok(self
            .api
            .post_json_raw(
                "/auth/register",
                &RegisterRequest {
                    name: "E2E Broker".into(),
                    email: email.to_string(),
                    password: password.to_string(),
                    phone: Some("+90 555 111 22 33".into()),
                    company: Some("E2E Emlak".into()),
                },
            )
            .await?)
    }

    /// Form login returning the raw response.
    pub async fn login_raw(&self, email: &str, password: &str) -> Result<reqwest::Response> {
        Ok(self
            .api
            .post_form_raw(
                "/auth/login",
                &LoginForm {
                    email: email.to_string(),
                    password: password.to_string(),
                },
            )
            .await?)
    }

    /// Premium agent + registered broker + session token.
    pub async fn register_broker(&self) -> Result<TestBroker> {
        let agent = self.create_agent(true).await?;
        let password = "testpass99".to_string();

        let resp = self.register_raw(&agent.email, &password).await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("register failed ({status}): {body}"));
        }
        let user: UserRead = resp.json().await?;

        let resp = self.login_raw(&agent.email, &password).await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("login failed ({status}): {body}"));
        }
        let login: LoginResponse = resp.json().await?;

        Ok(TestBroker {
            user,
            email: agent.email.clone(),
            agent,
            password,
            token: login.access_token,
        })
    }

    /// A fresh API client that carries `token` as its session.
    pub fn client_for(&self, token: &str) -> ApiClient {
        let mut api = self.api.clone();
        api.set_auth(token.to_string());
        api
    }

    // ── HTTP convenience methods (delegate to ApiClient) ──────────────

    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        Ok(self.api.get_raw(path).await?)
    }

    pub async fn get_authed(&self, path: &str, token: &str) -> Result<reqwest::Response> {
        Ok(self.api.get_with_auth(path, token).await?)
    }

    pub async fn post_json_authed<T: Serialize>(
        &self,
        path: &str,
        token: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        Ok(self.api.post_json_with_auth(path, token, body).await?)
    }

    pub async fn put_json_authed<T: Serialize>(
        &self,
        path: &str,
        token: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        Ok(self.api.put_json_with_auth(path, token, body).await?)
    }

    pub async fn delete_authed(&self, path: &str, token: &str) -> Result<reqwest::Response> {
        Ok(self.api.delete_with_auth(path, token).await?)
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.server.abort();
    }
}

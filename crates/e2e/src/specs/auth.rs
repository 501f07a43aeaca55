use anyhow::{Result, ensure};
use uuid::Uuid;

use brokerdesk_api::{DetailResponse, LoginResponse, SESSION_HEADER, UserRead};

use crate::client::TestContext;

/// POST /auth/register → user linked to the agent; login issues a token.
pub async fn register_and_login(ctx: &TestContext) -> Result<()> {
    let broker = ctx.register_broker().await?;
    ensure!(broker.user.agent_id == Some(broker.agent.id), "user must link to agent");
    ensure!(broker.user.email == broker.agent.email, "email must be stored as given");
    ensure!(broker.token.len() >= 32, "expected opaque session token");

    let resp = ctx.login_raw(&broker.email.to_uppercase(), &broker.password).await?;
    ensure!(resp.status() == 200, "login is case-insensitive on email, got {}", resp.status());
    let login: LoginResponse = resp.json().await?;
    ensure!(login.token_type == "bearer", "expected bearer token type");
    ensure!(login.access_token != broker.token, "each login gets a fresh token");

    let me: UserRead = ctx.get_authed("/auth/me", &broker.token).await?.json().await?;
    ensure!(me.id == broker.user.id, "me must return the session owner");
    Ok(())
}

/// Non-premium or missing agent → 403.
pub async fn register_requires_premium_agent(ctx: &TestContext) -> Result<()> {
    let agent = ctx.create_agent(false).await?;
    let resp = ctx.register_raw(&agent.email, "testpass99").await?;
    ensure!(resp.status() == 403, "non-premium agent: expected 403, got {}", resp.status());

    let stranger = format!("nobody-{}@e2e.local", Uuid::new_v4());
    let resp = ctx.register_raw(&stranger, "testpass99").await?;
    ensure!(resp.status() == 403, "no agent: expected 403, got {}", resp.status());
    Ok(())
}

/// Same email twice → 400.
pub async fn register_duplicate_email(ctx: &TestContext) -> Result<()> {
    let broker = ctx.register_broker().await?;
    let resp = ctx.register_raw(&broker.email, "anotherpass1").await?;
    ensure!(resp.status() == 400, "expected 400, got {}", resp.status());
    let body: DetailResponse = resp.json().await?;
    ensure!(!body.detail.is_empty(), "expected a detail message");
    Ok(())
}

/// Password under 8 characters → 400.
pub async fn register_short_password(ctx: &TestContext) -> Result<()> {
    let agent = ctx.create_agent(true).await?;
    let resp = ctx.register_raw(&agent.email, "short").await?;
    ensure!(resp.status() == 400, "expected 400, got {}", resp.status());
    Ok(())
}

/// Wrong password or unknown email → 401.
pub async fn login_wrong_password(ctx: &TestContext) -> Result<()> {
    let broker = ctx.register_broker().await?;
    let resp = ctx.login_raw(&broker.email, "wrongpass99").await?;
    ensure!(resp.status() == 401, "wrong password: expected 401, got {}", resp.status());

    let resp = ctx.login_raw("ghost@e2e.local", "testpass99").await?;
    ensure!(resp.status() == 401, "unknown email: expected 401, got {}", resp.status());
    Ok(())
}

/// Premium revoked after registration → login 403.
pub async fn login_after_premium_revoked(ctx: &TestContext) -> Result<()> {
    let broker = ctx.register_broker().await?;
    ctx.set_premium(&broker.agent, false).await?;

    let resp = ctx.login_raw(&broker.email, &broker.password).await?;
    ensure!(resp.status() == 403, "expected 403, got {}", resp.status());
    Ok(())
}

/// Premium revoked mid-session → listing create, update and delete all 403.
pub async fn property_writes_after_premium_revoked(ctx: &TestContext) -> Result<()> {
    let broker = ctx.register_broker().await?;
    let listing = ctx
        .client_for(&broker.token)
        .create_property(&crate::fixtures::land_listing("Önce Premium"))
        .await?;
    ctx.set_premium(&broker.agent, false).await?;

    let resp = ctx
        .post_json_authed("/properties/", &broker.token, &crate::fixtures::land_listing("Sonra"))
        .await?;
    ensure!(resp.status() == 403, "create: expected 403, got {}", resp.status());

    let path = format!("/properties/{}", listing.id);
    let resp = ctx
        .put_json_authed(&path, &broker.token, &serde_json::json!({"title": "Değişti"}))
        .await?;
    ensure!(resp.status() == 403, "update: expected 403, got {}", resp.status());

    let resp = ctx.delete_authed(&path, &broker.token).await?;
    ensure!(resp.status() == 403, "delete: expected 403, got {}", resp.status());

    let still = ctx.api.get_property(listing.id).await?;
    ensure!(still.title == "Önce Premium", "listing unchanged");
    Ok(())
}

/// Logout drops the token; a second logout is still fine.
pub async fn logout_invalidates_token(ctx: &TestContext) -> Result<()> {
    let broker = ctx.register_broker().await?;

    let resp = ctx.api.post_with_auth("/auth/logout", &broker.token).await?;
    ensure!(resp.status() == 200, "expected 200, got {}", resp.status());
    let body: DetailResponse = resp.json().await?;
    ensure!(!body.detail.is_empty(), "expected a detail message");

    let resp = ctx.get_authed("/auth/me", &broker.token).await?;
    ensure!(resp.status() == 401, "token must be dead, got {}", resp.status());

    let resp = ctx.api.post_with_auth("/auth/logout", &broker.token).await?;
    ensure!(resp.status() == 200, "logout is idempotent, got {}", resp.status());
    Ok(())
}

/// Missing or unknown `X-Session-Token` → 401 on protected routes.
pub async fn missing_or_bogus_token_is_unauthorized(ctx: &TestContext) -> Result<()> {
    let resp = ctx.get("/auth/me").await?;
    ensure!(resp.status() == 401, "missing token: expected 401, got {}", resp.status());

    let resp = ctx
        .http()
        .post(ctx.url("/properties/"))
        .header(SESSION_HEADER, "not-a-real-token")
        .json(&crate::fixtures::land_listing("Bogus"))
        .send()
        .await?;
    ensure!(resp.status() == 401, "bogus token: expected 401, got {}", resp.status());
    let body: DetailResponse = resp.json().await?;
    ensure!(!body.detail.is_empty(), "401 must carry a detail");

    let broker = ctx.register_broker().await?;
    let listing = ctx
        .client_for(&broker.token)
        .create_property(&crate::fixtures::apartment_listing("Korunan Daire"))
        .await?;
    let path = format!("/properties/{}", listing.id);

    let resp = ctx
        .put_json_authed(&path, "not-a-real-token", &serde_json::json!({"title": "x"}))
        .await?;
    ensure!(resp.status() == 401, "put: expected 401, got {}", resp.status());
    let resp = ctx.delete_authed(&path, "not-a-real-token").await?;
    ensure!(resp.status() == 401, "delete: expected 401, got {}", resp.status());

    let resp = ctx.http().put(ctx.url(&path)).json(&serde_json::json!({"title": "x"})).send().await?;
    ensure!(resp.status() == 401, "put without token: expected 401, got {}", resp.status());
    let resp = ctx.http().delete(ctx.url(&path)).send().await?;
    ensure!(resp.status() == 401, "delete without token: expected 401, got {}", resp.status());

    let resp = ctx.get_authed("/auth/me", "not-a-real-token").await?;
    ensure!(resp.status() == 401, "me: expected 401, got {}", resp.status());

    let still = ctx.api.get_property(listing.id).await?;
    ensure!(still.title == "Korunan Daire", "listing unchanged");
    Ok(())
}

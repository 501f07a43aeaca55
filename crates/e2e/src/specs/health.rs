use anyhow::{Result, ensure};

use crate::client::TestContext;

pub async fn health_check(ctx: &TestContext) -> Result<()> {
    let resp = ctx.http().get(ctx.url("/health")).send().await?;
    ensure!(resp.status() == 200, "expected 200, got {}", resp.status());

    let body: serde_json::Value = resp.json().await?;
    ensure!(body["status"] == "ok", "expected status=ok");
    ensure!(body["version"].is_string(), "expected version string");
    Ok(())
}

/// `/properties` and `/properties/` are the same route.
pub async fn routes_accept_trailing_slash(ctx: &TestContext) -> Result<()> {
    for path in ["/health/", "/properties", "/properties/", "/agents", "/agents/"] {
        let resp = ctx.get(path).await?;
        ensure!(resp.status() == 200, "{path}: expected 200, got {}", resp.status());
    }
    Ok(())
}

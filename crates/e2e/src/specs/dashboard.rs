use anyhow::{Context, Result, bail, ensure};

use brokerdesk_api_client::dashboard::SESSION_EXPIRED_MESSAGE;
use brokerdesk_api_client::{ClientError, Dashboard, Feedback, PropertyForm};

use crate::client::TestContext;

fn form(title: &str) -> PropertyForm {
    PropertyForm {
        title: title.to_string(),
        status: "satılık".into(),
        category: "isyeri".into(),
        price: "8.900.000 ₺".into(),
        location: "Çankaya, Ankara".into(),
        specs_text: "Cadde üzeri, Vitrinli\nDepolu".into(),
        ..PropertyForm::default()
    }
}

/// Login → create → edit → delete through the controller.
pub async fn dashboard_crud_flow(ctx: &TestContext) -> Result<()> {
    let broker = ctx.register_broker().await?;
    let mut dash = Dashboard::new(ctx.api.clone());

    dash.login(&broker.email, &broker.password).await?;
    ensure!(dash.state().is_logged_in(), "logged in");
    ensure!(dash.state().properties.is_empty(), "fresh broker has no listings");

    let created = dash.submit(&form("Dükkan")).await?;
    ensure!(created.specs.len() == 3, "spec text split, got {:?}", created.specs);
    ensure!(dash.state().properties.len() == 1, "table refreshed after create");
    ensure!(
        dash.state().feedback == Some(Feedback::Info("Listing created.".into())),
        "create feedback"
    );

    let mut edit = dash.start_edit(created.id).context("row is loaded")?;
    edit.title = "Köşe Dükkan".into();
    edit.location.clear();
    let updated = dash.submit(&edit).await?;
    ensure!(updated.id == created.id, "edit updates in place");
    ensure!(updated.title == "Köşe Dükkan", "title changed");
    ensure!(updated.location.is_none(), "cleared input clears the field");
    ensure!(dash.state().editing_id.is_none(), "edit mode ends after save");

    dash.delete(created.id).await?;
    ensure!(dash.state().properties.is_empty(), "row gone after delete");

    dash.logout().await?;
    ensure!(!dash.state().is_logged_in(), "logged out");
    let resp = ctx.get_authed("/auth/me", &broker.token).await?;
    ensure!(resp.status() == 200, "other sessions survive logout");
    Ok(())
}

/// A session killed server-side makes the next call log the dashboard out.
pub async fn dashboard_forces_logout_on_revoked_session(ctx: &TestContext) -> Result<()> {
    let broker = ctx.register_broker().await?;
    let mut dash = Dashboard::new(ctx.api.clone());
    dash.login(&broker.email, &broker.password).await?;
    dash.submit(&form("Ofis")).await?;

    let token = dash
        .client()
        .auth_token()
        .map(str::to_string)
        .context("token stored after login")?;
    ctx.api.post_with_auth("/auth/logout", &token).await?;

    let Err(err) = dash.refresh().await else {
        bail!("refresh must fail with a revoked session");
    };
    ensure!(err.is_unauthorized(), "expected 401, got {err}");
    ensure!(!dash.state().is_logged_in(), "session cleared");
    ensure!(dash.state().properties.is_empty(), "rows cleared");
    ensure!(
        dash.state().feedback == Some(Feedback::Error(SESSION_EXPIRED_MESSAGE.into())),
        "asks to log in again"
    );
    Ok(())
}

/// Premium revoked: login fails with the server's 403 detail as feedback.
pub async fn dashboard_rejects_non_premium_login(ctx: &TestContext) -> Result<()> {
    let broker = ctx.register_broker().await?;
    ctx.set_premium(&broker.agent, false).await?;

    let mut dash = Dashboard::new(ctx.api.clone());
    let Err(err) = dash.login(&broker.email, &broker.password).await else {
        bail!("login must fail for a non-premium agent");
    };
    ensure!(
        matches!(err, ClientError::Http { status: 403, .. }),
        "expected 403, got {err}"
    );
    ensure!(!dash.state().is_logged_in(), "not logged in");
    ensure!(
        dash.state().feedback.as_ref().is_some_and(|f| f.is_error()),
        "error feedback shown"
    );
    ensure!(!dash.state().loading, "loading flag cleared");
    Ok(())
}

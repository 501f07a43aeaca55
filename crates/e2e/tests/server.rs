use brokerdesk_api_client::{ClientError, Dashboard};
use brokerdesk_e2e::client::TestContext;

async fn get_ctx() -> TestContext {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "brokerdesk_server=warn".into()),
        )
        .with_test_writer()
        .try_init();
    TestContext::spawn().await.expect("start server")
}

macro_rules! e2e_test {
    ($module:ident :: $name:ident) => {
        #[tokio::test]
        async fn $name() {
            let ctx = get_ctx().await;
            brokerdesk_e2e::specs::$module::$name(&ctx).await.unwrap();
        }
    };
}

brokerdesk_e2e::for_each_spec!(e2e_test);

#[tokio::test]
async fn expired_session_is_rejected_and_forces_logout() {
    let ctx = TestContext::spawn_with(|config| config.session_ttl_secs = 0)
        .await
        .expect("start server");
    let broker = ctx.register_broker().await.expect("register broker");

    let resp = ctx
        .get_authed("/properties/?only_mine=true", &broker.token)
        .await
        .expect("request failed");
    assert_eq!(resp.status().as_u16(), 401, "zero-ttl session is already expired");

    let resp = ctx.get_authed("/auth/me", &broker.token).await.expect("request failed");
    assert_eq!(resp.status().as_u16(), 401, "me rejects an expired session");
    let resp = ctx
        .put_json_authed("/properties/1", &broker.token, &serde_json::json!({"title": "x"}))
        .await
        .expect("request failed");
    assert_eq!(resp.status().as_u16(), 401, "update rejects an expired session");
    let resp = ctx
        .delete_authed("/properties/1", &broker.token)
        .await
        .expect("request failed");
    assert_eq!(resp.status().as_u16(), 401, "delete rejects an expired session");

    let mut dash = Dashboard::new(ctx.api.clone());
    dash.login(&broker.email, &broker.password)
        .await
        .expect_err("login lists own rows with an expired token");
    assert!(!dash.state().is_logged_in(), "forced logout");
    assert!(dash.client().auth_token().is_none());
}

#[tokio::test]
async fn admin_routes_locked_without_configured_key() {
    let ctx = TestContext::spawn_with(|config| config.admin_key = None)
        .await
        .expect("start server");
    let err = ctx
        .api
        .create_agent(&ctx.admin_key, &brokerdesk_e2e::fixtures::agent("x@e2e.local", true))
        .await
        .expect_err("admin routes must be closed");
    assert!(matches!(err, ClientError::Http { status: 401, .. }));
}

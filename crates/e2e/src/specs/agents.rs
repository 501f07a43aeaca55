use anyhow::{Result, ensure};
use uuid::Uuid;

use brokerdesk_api::{ADMIN_KEY_HEADER, AgentListQuery, AgentRead, AgentSignupResponse};

use crate::client::TestContext;
use crate::fixtures;

fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@e2e.local", Uuid::new_v4())
}

/// Missing or wrong `X-Admin-Key` → 401 on every admin route.
pub async fn admin_routes_require_key(ctx: &TestContext) -> Result<()> {
    let body = fixtures::agent(&unique_email("admin"), true);

    let resp = ctx.http().post(ctx.url("/agents/")).json(&body).send().await?;
    ensure!(resp.status() == 401, "no key: expected 401, got {}", resp.status());

    let resp = ctx
        .http()
        .post(ctx.url("/agents/"))
        .header(ADMIN_KEY_HEADER, "wrong-key")
        .json(&body)
        .send()
        .await?;
    ensure!(resp.status() == 401, "wrong key: expected 401, got {}", resp.status());

    let agent = ctx.create_agent(false).await?;
    let path = ctx.url(&format!("/agents/{}", agent.slug));
    let resp = ctx.http().put(&path).json(&body).send().await?;
    ensure!(resp.status() == 401, "put: expected 401, got {}", resp.status());
    let resp = ctx.http().delete(&path).send().await?;
    ensure!(resp.status() == 401, "delete: expected 401, got {}", resp.status());
    Ok(())
}

/// Admin create → lookup by slug → update → delete unlinks brokers.
pub async fn admin_create_update_delete(ctx: &TestContext) -> Result<()> {
    let broker = ctx.register_broker().await?;
    let agent = ctx.api.get_agent(&broker.agent.slug).await?;
    ensure!(agent.is_premium, "created as premium");
    ensure!(agent.slug.starts_with("ayse-gunes"), "slug from name, got {}", agent.slug);

    let demoted = ctx.set_premium(&agent, false).await?;
    ensure!(!demoted.is_premium, "premium flag updated");
    ensure!(demoted.slug == agent.slug, "slug kept when unchanged");

    let resp = ctx
        .http()
        .delete(ctx.url(&format!("/agents/{}", agent.slug)))
        .header(ADMIN_KEY_HEADER, &ctx.admin_key)
        .send()
        .await?;
    ensure!(resp.status() == 200, "delete: expected 200, got {}", resp.status());

    let resp = ctx.get(&format!("/agents/{}", agent.slug)).await?;
    ensure!(resp.status() == 404, "deleted agent: expected 404, got {}", resp.status());

    // The broker survives but is no longer linked to a premium agent.
    let resp = ctx.login_raw(&broker.email, &broker.password).await?;
    ensure!(resp.status() == 403, "unlinked login: expected 403, got {}", resp.status());
    Ok(())
}

/// `skip`/`limit` page through agents in creation order.
pub async fn list_agents_pages(ctx: &TestContext) -> Result<()> {
    let mut created = Vec::new();
    for _ in 0..3 {
        created.push(ctx.create_agent(false).await?);
    }

    let all = ctx.api.list_agents(&AgentListQuery::default()).await?;
    ensure!(all.len() == 3, "expected 3 agents, got {}", all.len());

    let page = ctx
        .api
        .list_agents(&AgentListQuery { skip: 1, limit: 1 })
        .await?;
    ensure!(page.len() == 1 && page[0].id == created[1].id, "second page of one");

    let resp = ctx.get("/agents/?limit=100000").await?;
    ensure!(resp.status() == 200, "oversized limit is capped, got {}", resp.status());
    Ok(())
}

/// Sign-up slugs are transliterated and suffixed on collision; never premium.
pub async fn signup_generates_unique_slugs(ctx: &TestContext) -> Result<()> {
    let mut slugs = Vec::new();
    for _ in 0..3 {
        let resp = ctx
            .api
            .register_agent(&fixtures::signup_form("Çağrı Öztürk", &unique_email("signup")))
            .await?;
        slugs.push(resp.slug);
    }
    ensure!(
        slugs == vec!["cagri-ozturk", "cagri-ozturk-1", "cagri-ozturk-2"],
        "unexpected slugs {slugs:?}"
    );

    let agent = ctx.api.get_agent("cagri-ozturk-1").await?;
    ensure!(!agent.is_premium, "sign-ups are never premium");
    ensure!(agent.happy_customers == Some(42), "counter parsed from text");
    ensure!(agent.instagram_url.is_none(), "blank social links stored as null");
    Ok(())
}

/// Duplicate email, or an explicit slug already taken → 400.
pub async fn signup_rejects_duplicates(ctx: &TestContext) -> Result<()> {
    let email = unique_email("dup");
    let first = ctx
        .api
        .register_agent(&fixtures::signup_form("Mehmet Kaya", &email))
        .await?;

    let resp = ctx
        .api
        .post_form_raw("/agents/register", &fixtures::signup_form("Başka İsim", &email))
        .await?;
    ensure!(resp.status() == 400, "dup email: expected 400, got {}", resp.status());

    let mut form = fixtures::signup_form("Başka İsim", &unique_email("dup"));
    form.slug = first.slug.clone();
    let resp = ctx.api.post_form_raw("/agents/register", &form).await?;
    ensure!(resp.status() == 400, "dup slug: expected 400, got {}", resp.status());
    Ok(())
}

/// `register` is a route name: explicit requests are refused and generated
/// slugs skip it.
pub async fn register_slug_is_reserved(ctx: &TestContext) -> Result<()> {
    let mut body = fixtures::agent(&unique_email("reserved"), true);
    body.slug = Some("register".into());
    let resp = ctx
        .http()
        .post(ctx.url("/agents/"))
        .header(ADMIN_KEY_HEADER, &ctx.admin_key)
        .json(&body)
        .send()
        .await?;
    ensure!(resp.status() == 400, "admin create: expected 400, got {}", resp.status());

    let agent = ctx.create_agent(false).await?;
    body.email = agent.email.clone();
    let resp = ctx
        .http()
        .put(ctx.url(&format!("/agents/{}", agent.slug)))
        .header(ADMIN_KEY_HEADER, &ctx.admin_key)
        .json(&body)
        .send()
        .await?;
    ensure!(resp.status() == 400, "admin update: expected 400, got {}", resp.status());

    let mut form = fixtures::signup_form("Emre Yıldız", &unique_email("reserved"));
    form.slug = "register".into();
    let resp = ctx.api.post_form_raw("/agents/register", &form).await?;
    ensure!(resp.status() == 400, "sign-up: expected 400, got {}", resp.status());

    let generated = ctx
        .api
        .register_agent(&fixtures::signup_form("Register", &unique_email("reserved")))
        .await?;
    ensure!(generated.slug == "register-1", "generated slug {}", generated.slug);
    let fetched = ctx.api.get_agent(&generated.slug).await?;
    ensure!(fetched.email == generated.email, "generated slug is reachable");
    Ok(())
}

/// Non-numeric counters → 400.
pub async fn signup_rejects_bad_counters(ctx: &TestContext) -> Result<()> {
    let mut form = fixtures::signup_form("Zeynep Ak", &unique_email("counter"));
    form.successful_sales = "çok".into();
    let resp = ctx.api.post_form_raw("/agents/register", &form).await?;
    ensure!(resp.status() == 400, "expected 400, got {}", resp.status());

    let list: Vec<AgentRead> = ctx.get("/agents/").await?.json().await?;
    ensure!(list.is_empty(), "nothing stored on validation failure");
    Ok(())
}

/// Landing links follow the request's Origin; custom domains get a subdomain.
pub async fn signup_landing_urls(ctx: &TestContext) -> Result<()> {
    let form = fixtures::signup_form("Ali Veli", &unique_email("landing"));
    let resp: AgentSignupResponse = ctx
        .http()
        .post(ctx.url("/agents/register"))
        .header("Origin", "https://metraap.com")
        .form(&form)
        .send()
        .await?
        .json()
        .await?;
    ensure!(
        resp.landing_url == "https://metraap.com/landing/main.html?agent=ali-veli",
        "landing_url {}",
        resp.landing_url
    );
    ensure!(
        resp.agent_url == "https://ali-veli.metraap.com",
        "agent_url {}",
        resp.agent_url
    );

    let form = fixtures::signup_form("Ali Veli", &unique_email("landing"));
    let resp: AgentSignupResponse = ctx
        .http()
        .post(ctx.url("/agents/register"))
        .header("Origin", "http://localhost:8080")
        .form(&form)
        .send()
        .await?
        .json()
        .await?;
    ensure!(resp.slug == "ali-veli-1", "second sign-up suffixed, got {}", resp.slug);
    ensure!(
        resp.agent_url == resp.landing_url,
        "localhost falls back to landing url, got {}",
        resp.agent_url
    );
    Ok(())
}

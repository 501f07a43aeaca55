use anyhow::{Result, ensure};
use serde_json::json;

use brokerdesk_api::{PropertyListQuery, PropertyRead, PropertyUpdate};

use crate::client::TestContext;
use crate::fixtures;

/// Create → 200 with normalized fields; visible in the public list.
pub async fn create_and_list(ctx: &TestContext) -> Result<()> {
    let broker = ctx.register_broker().await?;
    let api = ctx.client_for(&broker.token);

    let created = api.create_property(&fixtures::land_listing("Urla Arsa")).await?;
    ensure!(created.user_id == broker.user.id, "owner must be the caller");
    ensure!(created.category == "arsa", "category stored lowercase");
    ensure!(created.status == "satılık", "status stored lowercase");
    ensure!(
        created.specs == vec!["Yola cepheli", "Elektrik var"],
        "specs trimmed and blanks dropped, got {:?}",
        created.specs
    );

    let second = api.create_property(&fixtures::apartment_listing("Kiralık Daire")).await?;
    ensure!(second.specs.is_empty(), "no specs reads back as []");

    let rows = ctx.api.list_properties(&PropertyListQuery::default()).await?;
    ensure!(rows.len() == 2, "expected 2 rows, got {}", rows.len());
    ensure!(rows[0].id == second.id, "newest listing comes first");

    let fetched = ctx.api.get_property(created.id).await?;
    ensure!(fetched == created, "get must match create response");
    Ok(())
}

/// `only_mine=true` only returns the caller's rows.
pub async fn only_mine_scopes_to_owner(ctx: &TestContext) -> Result<()> {
    let alice = ctx.register_broker().await?;
    let bob = ctx.register_broker().await?;

    let mine = ctx
        .client_for(&alice.token)
        .create_property(&fixtures::land_listing("Alice Arsa"))
        .await?;
    ctx.client_for(&bob.token)
        .create_property(&fixtures::apartment_listing("Bob Daire"))
        .await?;

    let rows = ctx
        .client_for(&alice.token)
        .list_properties(&PropertyListQuery::mine())
        .await?;
    ensure!(rows.len() == 1, "expected 1 own row, got {}", rows.len());
    ensure!(rows[0].id == mine.id, "expected alice's listing");

    let all = ctx.api.list_properties(&PropertyListQuery::default()).await?;
    ensure!(all.len() == 2, "public list shows everything");
    Ok(())
}

/// `only_mine` without a valid session → 401; plain list ignores bad tokens.
pub async fn only_mine_requires_session(ctx: &TestContext) -> Result<()> {
    let resp = ctx.get("/properties/?only_mine=true").await?;
    ensure!(resp.status() == 401, "expected 401, got {}", resp.status());

    let resp = ctx.get_authed("/properties/?only_mine=true", "expired-or-bogus").await?;
    ensure!(resp.status() == 401, "bogus token: expected 401, got {}", resp.status());

    let resp = ctx.get_authed("/properties/", "expired-or-bogus").await?;
    ensure!(resp.status() == 200, "public list must ignore bad token, got {}", resp.status());
    Ok(())
}

pub async fn get_missing_property(ctx: &TestContext) -> Result<()> {
    let resp = ctx.get("/properties/999999").await?;
    ensure!(resp.status() == 404, "expected 404, got {}", resp.status());
    Ok(())
}

/// PUT applies only the sent fields; explicit null clears.
pub async fn partial_update_and_clear(ctx: &TestContext) -> Result<()> {
    let broker = ctx.register_broker().await?;
    let api = ctx.client_for(&broker.token);
    let created = api.create_property(&fixtures::land_listing("Eski Başlık")).await?;

    let updated = api
        .update_property(
            created.id,
            &PropertyUpdate {
                title: Some("Yeni Başlık".into()),
                category: Some("Isyeri".into()),
                ..PropertyUpdate::default()
            },
        )
        .await?;
    ensure!(updated.title == "Yeni Başlık", "title updated");
    ensure!(updated.category == "isyeri", "category normalized");
    ensure!(updated.price == created.price, "untouched fields survive");
    ensure!(updated.specs == created.specs, "specs untouched");

    let resp = ctx
        .put_json_authed(
            &format!("/properties/{}", created.id),
            &broker.token,
            &json!({"price": null, "specs": null}),
        )
        .await?;
    ensure!(resp.status() == 200, "expected 200, got {}", resp.status());
    let cleared: PropertyRead = resp.json().await?;
    ensure!(cleared.price.is_none(), "price cleared");
    ensure!(cleared.specs.is_empty(), "specs cleared");
    ensure!(cleared.location == created.location, "location untouched");

    let resp = ctx
        .put_json_authed(&format!("/properties/{}", created.id), &broker.token, &json!({}))
        .await?;
    ensure!(resp.status() == 200, "empty update is a no-op, got {}", resp.status());

    let resp = ctx
        .put_json_authed("/properties/999999", &broker.token, &json!({"title": "x"}))
        .await?;
    ensure!(resp.status() == 404, "missing row: expected 404, got {}", resp.status());
    Ok(())
}

/// Another broker's listing → 403 on update and delete.
pub async fn non_owner_cannot_modify(ctx: &TestContext) -> Result<()> {
    let owner = ctx.register_broker().await?;
    let intruder = ctx.register_broker().await?;
    let listing = ctx
        .client_for(&owner.token)
        .create_property(&fixtures::apartment_listing("Sahipli Daire"))
        .await?;
    let path = format!("/properties/{}", listing.id);

    let resp = ctx
        .put_json_authed(&path, &intruder.token, &json!({"title": "hijacked"}))
        .await?;
    ensure!(resp.status() == 403, "update: expected 403, got {}", resp.status());

    let resp = ctx.delete_authed(&path, &intruder.token).await?;
    ensure!(resp.status() == 403, "delete: expected 403, got {}", resp.status());

    let still = ctx.api.get_property(listing.id).await?;
    ensure!(still.title == "Sahipli Daire", "listing unchanged");
    Ok(())
}

/// DELETE → 204 and the row disappears from listings.
pub async fn delete_removes_listing(ctx: &TestContext) -> Result<()> {
    let broker = ctx.register_broker().await?;
    let listing = ctx
        .client_for(&broker.token)
        .create_property(&fixtures::land_listing("Silinecek"))
        .await?;
    let path = format!("/properties/{}", listing.id);

    let resp = ctx.delete_authed(&path, &broker.token).await?;
    ensure!(resp.status() == 204, "expected 204, got {}", resp.status());

    let rows = ctx
        .client_for(&broker.token)
        .list_properties(&PropertyListQuery::mine())
        .await?;
    ensure!(rows.iter().all(|p| p.id != listing.id), "deleted row still listed");

    let resp = ctx.delete_authed(&path, &broker.token).await?;
    ensure!(resp.status() == 404, "second delete: expected 404, got {}", resp.status());
    Ok(())
}

/// Categories outside arsa/isyeri/daire → 400 on create and filter.
pub async fn invalid_category_rejected(ctx: &TestContext) -> Result<()> {
    let broker = ctx.register_broker().await?;
    let mut listing = fixtures::land_listing("Villa");
    listing.category = "villa".into();

    let resp = ctx
        .post_json_authed("/properties/", &broker.token, &listing)
        .await?;
    ensure!(resp.status() == 400, "create: expected 400, got {}", resp.status());

    let resp = ctx.get("/properties/?category=villa").await?;
    ensure!(resp.status() == 400, "filter: expected 400, got {}", resp.status());
    Ok(())
}

/// Filters by agent slug/email, category and featured.
pub async fn filter_by_agent(ctx: &TestContext) -> Result<()> {
    let alice = ctx.register_broker().await?;
    let bob = ctx.register_broker().await?;
    ctx.client_for(&alice.token)
        .create_property(&fixtures::land_listing("Alice Arsa"))
        .await?;
    ctx.client_for(&bob.token)
        .create_property(&fixtures::apartment_listing("Bob Daire"))
        .await?;

    let by_slug = ctx
        .api
        .list_properties(&PropertyListQuery {
            agent_slug: Some(alice.agent.slug.clone()),
            ..PropertyListQuery::default()
        })
        .await?;
    ensure!(by_slug.len() == 1 && by_slug[0].user_id == alice.user.id, "slug filter");

    let by_email = ctx
        .api
        .list_properties(&PropertyListQuery {
            agent_email: Some(bob.agent.email.to_uppercase()),
            ..PropertyListQuery::default()
        })
        .await?;
    ensure!(by_email.len() == 1 && by_email[0].user_id == bob.user.id, "email filter");

    let featured = ctx
        .api
        .list_properties(&PropertyListQuery {
            featured: Some(true),
            category: Some("daire".into()),
            ..PropertyListQuery::default()
        })
        .await?;
    ensure!(featured.len() == 1 && featured[0].title == "Bob Daire", "featured filter");
    Ok(())
}

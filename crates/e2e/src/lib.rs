pub mod client;
pub mod fixtures;
pub mod specs;

/// Invoke `$mac!(module::name)` for every E2E spec.
///
/// This is the **single source of truth** for the E2E case list; `tests/server.rs`
/// turns each entry into a `#[tokio::test]` against a fresh in-process server.
#[macro_export]
macro_rules! for_each_spec {
    ($mac:ident) => {
        // health (2)
        $mac!(health::health_check);
        $mac!(health::routes_accept_trailing_slash);

        // auth (9)
        $mac!(auth::register_and_login);
        $mac!(auth::register_requires_premium_agent);
        $mac!(auth::register_duplicate_email);
        $mac!(auth::register_short_password);
        $mac!(auth::login_wrong_password);
        $mac!(auth::login_after_premium_revoked);
        $mac!(auth::property_writes_after_premium_revoked);
        $mac!(auth::logout_invalidates_token);
        $mac!(auth::missing_or_bogus_token_is_unauthorized);

        // properties (9)
        $mac!(properties::create_and_list);
        $mac!(properties::only_mine_scopes_to_owner);
        $mac!(properties::only_mine_requires_session);
        $mac!(properties::get_missing_property);
        $mac!(properties::partial_update_and_clear);
        $mac!(properties::non_owner_cannot_modify);
        $mac!(properties::delete_removes_listing);
        $mac!(properties::invalid_category_rejected);
        $mac!(properties::filter_by_agent);

        // agents (8)
        $mac!(agents::admin_routes_require_key);
        $mac!(agents::admin_create_update_delete);
        $mac!(agents::list_agents_pages);
        $mac!(agents::signup_generates_unique_slugs);
        $mac!(agents::signup_rejects_duplicates);
        $mac!(agents::register_slug_is_reserved);
        $mac!(agents::signup_rejects_bad_counters);
        $mac!(agents::signup_landing_urls);

        // dashboard (3)
        $mac!(dashboard::dashboard_crud_flow);
        $mac!(dashboard::dashboard_forces_logout_on_revoked_session);
        $mac!(dashboard::dashboard_rejects_non_premium_login);
    };
}

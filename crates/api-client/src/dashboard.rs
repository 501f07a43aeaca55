//! Dashboard view-model and controller.
//!
//! [`DashboardState`] is everything the portfolio screen renders;
//! [`Dashboard`] owns it together with an [`ApiClient`] and exposes one
//! handler per user action. Rendering is left to the caller.

use brokerdesk_api::{LoginForm, PropertyCreate, PropertyListQuery, PropertyRead, PropertyUpdate, UserRead};

use crate::client::{ApiClient, ClientError, Result};

/// Logged-in broker.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: UserRead,
}

/// Message shown above the property table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    Info(String),
    Error(String),
}

impl Feedback {
    pub fn text(&self) -> &str {
        match self {
            Self::Info(t) | Self::Error(t) => t,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired, please log in again.";

/// Client-side state of the dashboard.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub session: Option<Session>,
    pub properties: Vec<PropertyRead>,
    pub only_mine: bool,
    pub editing_id: Option<i64>,
    pub loading: bool,
    pub feedback: Option<Feedback>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            session: None,
            properties: Vec::new(),
            only_mine: true,
            editing_id: None,
            loading: false,
            feedback: None,
        }
    }
}

impl DashboardState {
    pub fn is_logged_in(&self) -> bool {
        self.session.is_some()
    }

    pub fn user(&self) -> Option<&UserRead> {
        self.session.as_ref().map(|s| &s.user)
    }

    /// The row currently loaded into the edit form.
    pub fn editing(&self) -> Option<&PropertyRead> {
        let id = self.editing_id?;
        self.properties.iter().find(|p| p.id == id)
    }

    fn clear_session(&mut self) {
        self.session = None;
        self.properties.clear();
        self.editing_id = None;
    }
}

/// Property form as typed into the dashboard: every field is text except
/// `featured`, and spec tags are one comma/newline separated string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyForm {
    pub title: String,
    pub status: String,
    pub category: String,
    pub price: String,
    pub location: String,
    pub description: String,
    pub tagline: String,
    pub image_url: String,
    pub area: String,
    pub rooms: String,
    pub zoning_status: String,
    pub floor: String,
    pub building_age: String,
    pub featured: bool,
    pub specs_text: String,
}

fn blank_to_none(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl PropertyForm {
    /// Split spec text on commas and newlines, dropping blank entries.
    pub fn parse_specs(text: &str) -> Vec<String> {
        text.split([',', '\n'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Prefill the form from an existing row.
    pub fn from_property(p: &PropertyRead) -> Self {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            title: p.title.clone(),
            status: p.status.clone(),
            category: p.category.clone(),
            price: text(&p.price),
            location: text(&p.location),
            description: text(&p.description),
            tagline: text(&p.tagline),
            image_url: text(&p.image_url),
            area: text(&p.area),
            rooms: text(&p.rooms),
            zoning_status: text(&p.zoning_status),
            floor: text(&p.floor),
            building_age: text(&p.building_age),
            featured: p.featured,
            specs_text: p.specs.join("\n"),
        }
    }

    fn specs(&self) -> Option<Vec<String>> {
        let specs = Self::parse_specs(&self.specs_text);
        (!specs.is_empty()).then_some(specs)
    }

    pub fn to_create(&self) -> PropertyCreate {
        PropertyCreate {
            title: self.title.trim().to_string(),
            status: self.status.trim().to_string(),
            category: self.category.trim().to_string(),
            price: blank_to_none(&self.price),
            location: blank_to_none(&self.location),
            description: blank_to_none(&self.description),
            tagline: blank_to_none(&self.tagline),
            image_url: blank_to_none(&self.image_url),
            area: blank_to_none(&self.area),
            rooms: blank_to_none(&self.rooms),
            zoning_status: blank_to_none(&self.zoning_status),
            floor: blank_to_none(&self.floor),
            building_age: blank_to_none(&self.building_age),
            featured: self.featured,
            specs: self.specs(),
        }
    }

    /// Full-form update: blank optional fields are sent as `null` so that
    /// clearing an input clears the stored value.
    pub fn to_update(&self) -> PropertyUpdate {
        PropertyUpdate {
            title: Some(self.title.trim().to_string()),
            status: Some(self.status.trim().to_string()),
            category: Some(self.category.trim().to_string()),
            price: Some(blank_to_none(&self.price)),
            location: Some(blank_to_none(&self.location)),
            description: Some(blank_to_none(&self.description)),
            tagline: Some(blank_to_none(&self.tagline)),
            image_url: Some(blank_to_none(&self.image_url)),
            area: Some(blank_to_none(&self.area)),
            rooms: Some(blank_to_none(&self.rooms)),
            zoning_status: Some(blank_to_none(&self.zoning_status)),
            floor: Some(blank_to_none(&self.floor)),
            building_age: Some(blank_to_none(&self.building_age)),
            featured: Some(self.featured),
            specs: Some(self.specs()),
        }
    }
}

/// Controller driving [`DashboardState`] through the API.
pub struct Dashboard {
    client: ApiClient,
    state: DashboardState,
}

impl Dashboard {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            state: DashboardState::default(),
        }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    fn begin(&mut self) -> Result<InFlight<'_>> {
        if self.state.loading {
            return Err(ClientError::Busy);
        }
        self.state.loading = true;
        Ok(InFlight { dashboard: self })
    }

    /// Clear the loading flag and turn an error into feedback. A 401 while
    /// logged in ends the local session.
    fn finish<T>(&mut self, result: Result<T>) -> Result<T> {
        self.state.loading = false;
        if let Err(err) = &result {
            if err.is_unauthorized() && self.state.is_logged_in() {
                tracing::info!("session rejected by server, logging out");
                self.force_logout();
            } else {
                let text = match err {
                    ClientError::Http { detail, .. } => detail.clone(),
                    ClientError::NotAuthenticated => "Please log in first.".to_string(),
                    other => other.to_string(),
                };
                self.state.feedback = Some(Feedback::Error(text));
            }
        }
        result
    }

    fn force_logout(&mut self) {
        self.client.clear_auth();
        self.state.clear_session();
        self.state.feedback = Some(Feedback::Error(SESSION_EXPIRED_MESSAGE.to_string()));
    }

    async fn load_properties(&mut self) -> Result<()> {
        let query = PropertyListQuery {
            only_mine: self.state.only_mine,
            ..PropertyListQuery::default()
        };
        if query.only_mine && !self.state.is_logged_in() {
            return Err(ClientError::NotAuthenticated);
        }
        self.state.properties = self.client.list_properties(&query).await?;
        if self
            .state
            .editing_id
            .is_some_and(|id| !self.state.properties.iter().any(|p| p.id == id))
        {
            self.state.editing_id = None;
        }
        Ok(())
    }

    // ── Handlers ──────────────────────────────────────────────────────────

    pub async fn login(&mut self, email: &str, password: &str) -> Result<()> {
        let mut op = self.begin()?;
        let result = op.do_login(email, password).await;
        op.finish(result)
    }

    async fn do_login(&mut self, email: &str, password: &str) -> Result<()> {
        let resp = self
            .client
            .login(&LoginForm {
                email: email.trim().to_string(),
                password: password.to_string(),
            })
            .await?;
        self.client.set_auth(resp.access_token.clone());
        self.state.feedback = Some(Feedback::Info(format!("Welcome, {}.", resp.user.name)));
        self.state.session = Some(Session {
            token: resp.access_token,
            user: resp.user,
        });
        self.load_properties().await
    }

    /// End the session on the server (best effort) and locally.
    pub async fn logout(&mut self) -> Result<()> {
        let mut op = self.begin()?;
        if op.state.is_logged_in() {
            if let Err(e) = op.client.logout().await {
                tracing::warn!("logout request failed: {e}");
            }
        }
        op.client.clear_auth();
        op.state.clear_session();
        op.state.feedback = Some(Feedback::Info("Logged out.".to_string()));
        op.finish(Ok(()))
    }

    pub async fn refresh(&mut self) -> Result<()> {
        let mut op = self.begin()?;
        let result = op.load_properties().await;
        op.finish(result)
    }

    pub async fn set_only_mine(&mut self, only_mine: bool) -> Result<()> {
        let mut op = self.begin()?;
        op.state.only_mine = only_mine;
        let result = op.load_properties().await;
        op.finish(result)
    }

    /// Load a row into the edit form. Returns `None` for unknown ids.
    pub fn start_edit(&mut self, id: i64) -> Option<PropertyForm> {
        let form = self
            .state
            .properties
            .iter()
            .find(|p| p.id == id)
            .map(PropertyForm::from_property)?;
        self.state.editing_id = Some(id);
        Some(form)
    }

    pub fn cancel_edit(&mut self) {
        self.state.editing_id = None;
    }

    /// Create a listing, or update the one being edited.
    pub async fn submit(&mut self, form: &PropertyForm) -> Result<PropertyRead> {
        let mut op = self.begin()?;
        let result = op.do_submit(form).await;
        op.finish(result)
    }

    async fn do_submit(&mut self, form: &PropertyForm) -> Result<PropertyRead> {
        if !self.state.is_logged_in() {
            return Err(ClientError::NotAuthenticated);
        }
        let saved = match self.state.editing_id {
            Some(id) => self.client.update_property(id, &form.to_update()).await?,
            None => self.client.create_property(&form.to_create()).await?,
        };
        let message = if self.state.editing_id.is_some() {
            "Listing updated."
        } else {
            "Listing created."
        };
        self.state.editing_id = None;
        self.load_properties().await?;
        self.state.feedback = Some(Feedback::Info(message.to_string()));
        Ok(saved)
    }

    pub async fn delete(&mut self, id: i64) -> Result<()> {
        let mut op = self.begin()?;
        let result = op.do_delete(id).await;
        op.finish(result)
    }

    async fn do_delete(&mut self, id: i64) -> Result<()> {
        if !self.state.is_logged_in() {
            return Err(ClientError::NotAuthenticated);
        }
        self.client.delete_property(id).await?;
        if self.state.editing_id == Some(id) {
            self.state.editing_id = None;
        }
        self.load_properties().await?;
        self.state.feedback = Some(Feedback::Info("Listing deleted.".to_string()));
        Ok(())
    }
}

/// Holds the loading flag for one handler call. Dropping it, including
/// when the handler's future is abandoned mid-request, clears the flag.
struct InFlight<'a> {
    dashboard: &'a mut Dashboard,
}

impl std::ops::Deref for InFlight<'_> {
    type Target = Dashboard;

    fn deref(&self) -> &Dashboard {
        self.dashboard
    }
}

impl std::ops::DerefMut for InFlight<'_> {
    fn deref_mut(&mut self) -> &mut Dashboard {
        self.dashboard
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.dashboard.state.loading = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn offline_dashboard() -> Dashboard {
        let client = ApiClient::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        Dashboard::new(client)
    }

    fn sample_property() -> PropertyRead {
        PropertyRead {
            id: 3,
            user_id: 1,
            title: "Deniz Manzaralı Daire".into(),
            status: "satılık".into(),
            category: "daire".into(),
            price: Some("4.500.000 ₺".into()),
            location: None,
            description: None,
            tagline: None,
            image_url: None,
            area: Some("120 m²".into()),
            rooms: Some("3+1".into()),
            zoning_status: None,
            floor: None,
            building_age: None,
            featured: true,
            specs: vec!["Asansör".into(), "Otopark".into()],
            created_at: "2025-01-01 10:00:00".into(),
            updated_at: "2025-01-01 10:00:00".into(),
        }
    }

    #[test]
    fn spec_text_splits_on_commas_and_newlines() {
        assert_eq!(
            PropertyForm::parse_specs("Asansör, Otopark\n\n Doğalgaz ,"),
            vec!["Asansör", "Otopark", "Doğalgaz"]
        );
        assert!(PropertyForm::parse_specs(" , \n").is_empty());
    }

    #[test]
    fn form_round_trips_existing_row() {
        let form = PropertyForm::from_property(&sample_property());
        assert_eq!(form.specs_text, "Asansör\nOtopark");
        assert_eq!(form.location, "");

        let update = form.to_update();
        assert_eq!(update.price, Some(Some("4.500.000 ₺".to_string())));
        assert_eq!(update.location, Some(None), "blank input clears the field");
        assert_eq!(
            update.specs,
            Some(Some(vec!["Asansör".to_string(), "Otopark".to_string()]))
        );
    }

    #[test]
    fn create_payload_drops_blank_optionals() {
        let form = PropertyForm {
            title: " Arsa ".into(),
            status: "satılık".into(),
            category: "arsa".into(),
            area: "  ".into(),
            ..PropertyForm::default()
        };
        let create = form.to_create();
        assert_eq!(create.title, "Arsa");
        assert_eq!(create.area, None);
        assert_eq!(create.specs, None);
    }

    #[test]
    fn start_edit_requires_known_row() {
        let mut dash = offline_dashboard();
        assert!(dash.start_edit(3).is_none());

        dash.state.properties.push(sample_property());
        let form = dash.start_edit(3).unwrap();
        assert_eq!(form.title, "Deniz Manzaralı Daire");
        assert_eq!(dash.state().editing().map(|p| p.id), Some(3));

        dash.cancel_edit();
        assert!(dash.state().editing_id.is_none());
    }

    #[tokio::test]
    async fn busy_dashboard_rejects_second_request() {
        let mut dash = offline_dashboard();
        dash.state.loading = true;
        let err = dash.refresh().await.unwrap_err();
        assert!(matches!(err, ClientError::Busy));
        assert!(dash.state().loading, "in-flight request keeps the flag");
    }

    #[tokio::test]
    async fn abandoned_request_releases_loading_flag() {
        // Accepts connections but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = ApiClient::new(&format!("http://{addr}"), Duration::from_secs(30)).unwrap();
        let mut dash = Dashboard::new(client);
        dash.state.only_mine = false;

        let abandoned = tokio::time::timeout(Duration::from_millis(100), dash.refresh()).await;
        assert!(abandoned.is_err(), "request must still be pending");
        assert!(!dash.state().loading, "dropped handler clears the flag");

        drop(listener);
        let err = dash.refresh().await.unwrap_err();
        assert!(!matches!(err, ClientError::Busy), "next action is not blocked");
    }

    #[tokio::test]
    async fn submit_without_session_asks_for_login() {
        let mut dash = offline_dashboard();
        let err = dash.submit(&PropertyForm::default()).await.unwrap_err();
        assert!(matches!(err, ClientError::NotAuthenticated));
        assert!(!dash.state().loading);
        let feedback = dash.state().feedback.clone().unwrap();
        assert!(feedback.is_error());
        assert_eq!(feedback.text(), "Please log in first.");
    }

    #[test]
    fn unauthorized_while_logged_in_forces_logout() {
        let mut dash = offline_dashboard();
        dash.client.set_auth("stale".into());
        dash.state.session = Some(Session {
            token: "stale".into(),
            user: UserRead {
                id: 1,
                name: "Broker".into(),
                email: "broker@example.com".into(),
                phone: None,
                company: None,
                agent_id: Some(1),
            },
        });
        dash.state.properties.push(sample_property());
        dash.state.editing_id = Some(3);
        dash.state.loading = true;

        let result: Result<()> = dash.finish(Err(ClientError::Http {
            status: 401,
            detail: "invalid or expired session".into(),
        }));
        assert!(result.is_err());
        assert!(!dash.state().is_logged_in());
        assert!(dash.state().properties.is_empty());
        assert!(dash.state().editing_id.is_none());
        assert!(dash.client().auth_token().is_none());
        assert_eq!(
            dash.state().feedback,
            Some(Feedback::Error(SESSION_EXPIRED_MESSAGE.to_string()))
        );
    }
}

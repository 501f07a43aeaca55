pub mod client;
pub mod dashboard;

pub use brokerdesk_api;
pub use client::{ApiClient, ClientError};
pub use dashboard::{Dashboard, DashboardState, Feedback, PropertyForm, Session};

use brokerdesk_api::AgentRead;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct SignupWebhook<'a> {
    message: &'static str,
    agent: SignupAgent<'a>,
}

#[derive(Debug, Serialize)]
struct SignupAgent<'a> {
    #[serde(flatten)]
    agent: &'a AgentRead,
    landing_url: &'a str,
    agent_url: &'a str,
}

fn payload<'a>(agent: &'a AgentRead, landing_url: &'a str, agent_url: &'a str) -> SignupWebhook<'a> {
    SignupWebhook {
        message: "New agent sign-up",
        agent: SignupAgent {
            agent,
            landing_url,
            agent_url,
        },
    }
}

/// Fire-and-forget POST of a fresh sign-up to the configured webhook.
pub fn spawn_signup_webhook(
    http: reqwest::Client,
    url: String,
    agent: AgentRead,
    landing_url: String,
    agent_url: String,
) {
    tokio::spawn(async move {
        let body = payload(&agent, &landing_url, &agent_url);
        match http.post(&url).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::debug!("signup webhook delivered for agent {}", agent.slug);
            }
            Ok(resp) => {
                tracing::warn!("signup webhook returned {} for agent {}", resp.status(), agent.slug);
            }
            Err(e) => tracing::warn!("signup webhook failed: {e}"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_flattens_agent_fields() {
        let agent = AgentRead {
            id: 7,
            name: "Ayşe Yılmaz".into(),
            email: "ayse@example.com".into(),
            phone: "+90 555 000 00 00".into(),
            company: None,
            experience: Some("10".into()),
            profile_photo_url: None,
            city: Some("İzmir".into()),
            happy_customers: Some(120),
            successful_sales: Some(80),
            instagram_url: None,
            facebook_url: None,
            slug: "ayse-yilmaz".into(),
            is_premium: false,
        };
        let value = serde_json::to_value(payload(
            &agent,
            "https://metraap.com/landing/main.html?agent=ayse-yilmaz",
            "https://ayse-yilmaz.metraap.com",
        ))
        .unwrap();
        assert_eq!(value["agent"]["slug"], "ayse-yilmaz");
        assert_eq!(value["agent"]["happy_customers"], 120);
        assert_eq!(value["agent"]["agent_url"], "https://ayse-yilmaz.metraap.com");
    }
}

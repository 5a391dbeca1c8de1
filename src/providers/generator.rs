use crate::errors::Result;
use crate::models::Message;
use crate::providers::MessageGenerator;
use async_trait::async_trait;

/// Template-based message generation; works without any API key. An
/// LLM-backed generator implements the same trait and slots in unchanged.
pub struct TemplateGenerator {
    pub sender_name: String,
    pub pitch: String,
}

impl TemplateGenerator {
    pub fn from_env() -> Self {
        Self {
            sender_name: std::env::var("SENDER_NAME").unwrap_or_else(|_| "Outreach".to_string()),
            pitch: std::env::var("SENDER_PITCH").unwrap_or_else(|_| {
                "I'd love to learn more about opportunities on your team".to_string()
            }),
        }
    }
}

#[async_trait]
impl MessageGenerator for TemplateGenerator {
    async fn generate(&self, contact_name: &str, organization: &str) -> Result<Message> {
        let first_name = contact_name.split_whitespace().next().unwrap_or("there");
        let subject = format!("Reaching out about {organization}");
        let body = format!(
            "Hi {first_name},\n\n\
             I came across your profile while researching {organization} and wanted to \
             reach out directly. {pitch}.\n\n\
             Would you be open to a quick chat?\n\n\
             Thanks,\n{sender}",
            pitch = self.pitch,
            sender = self.sender_name,
        );
        Ok(Message { subject, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn addresses_contact_by_first_name() {
        let generator = TemplateGenerator {
            sender_name: "Jo Doe".to_string(),
            pitch: "I build data tools".to_string(),
        };
        let message = generator.generate("Amy Salazar", "Stripe").await.unwrap();
        assert!(message.subject.contains("Stripe"));
        assert!(message.body.starts_with("Hi Amy,"));
        assert!(message.body.contains("Jo Doe"));
    }

    #[tokio::test]
    async fn empty_contact_name_falls_back_to_generic_greeting() {
        let generator = TemplateGenerator {
            sender_name: "Jo".to_string(),
            pitch: "hello".to_string(),
        };
        let message = generator.generate("", "Acme").await.unwrap();
        assert!(message.body.starts_with("Hi there,"));
    }
}

use crate::database::{self, DbPool};
use crate::errors::{OutreachError, Result};
use crate::models::{OutreachResult, OutreachStatus, SendReceipt};
use crate::providers::{MessageGenerator, SendTransport};
use crate::rate_limit::SendThrottle;
use crate::retry::RetryPolicy;
use dialoguer::{theme::ColorfulTheme, Confirm};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutreachConfig {
    pub enabled: bool,
    /// Hard cap on messages per run.
    pub send_limit: usize,
    /// Global minimum delay between sends, enforced across all workers.
    pub min_send_delay_ms: u64,
    /// Batches above this size ask for interactive confirmation.
    pub require_confirmation_above: usize,
    /// Skip the confirmation prompt; for unattended runs.
    pub assume_yes: bool,
}

impl Default for OutreachConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            send_limit: 25,
            min_send_delay_ms: 30_000,
            require_confirmation_above: 10,
            assume_yes: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct OutreachSummary {
    pub sent: usize,
    pub skipped_duplicates: usize,
    pub failed: usize,
}

impl OutreachSummary {
    pub fn print(&self) {
        println!("\n📧 Outreach Summary");
        println!("━━━━━━━━━━━━━━━━━━━━━");
        println!("   ✅ Sent:              {}", self.sent);
        println!("   ⏭  Skipped (dup):     {}", self.skipped_duplicates);
        println!("   ❌ Failed:            {}", self.failed);
    }
}

/// Drive the send phase over the batch results: dedup gate, throttle,
/// per-recipient failure isolation.
pub async fn run_outreach(
    pool: &DbPool,
    transport: &dyn SendTransport,
    generator: &dyn MessageGenerator,
    throttle: &SendThrottle,
    retry: &RetryPolicy,
    config: &OutreachConfig,
    results: &[OutreachResult],
) -> Result<OutreachSummary> {
    let mut summary = OutreachSummary::default();

    let eligible: Vec<&OutreachResult> = results
        .iter()
        .filter(|r| r.status == OutreachStatus::Found && r.email.is_some())
        .take(config.send_limit)
        .collect();
    if eligible.is_empty() {
        info!("📭 No contacts eligible for outreach");
        return Ok(summary);
    }

    if eligible.len() > config.require_confirmation_above && !config.assume_yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Send {} outreach emails?", eligible.len()))
            .interact()
            .map_err(|e| OutreachError::Config(format!("confirmation prompt failed: {e}")))?;
        if !confirmed {
            info!("Outreach cancelled at the confirmation prompt");
            return Ok(summary);
        }
    }

    info!("📤 Sending up to {} outreach emails", eligible.len());
    for result in eligible {
        let Some(address) = result.email.as_deref() else {
            continue;
        };
        match send_one(pool, transport, generator, throttle, retry, result, address).await {
            Ok(receipt) => {
                info!(
                    "✅ Sent to {} at {}: {}",
                    address, result.organization.name, receipt.id
                );
                summary.sent += 1;
            }
            Err(OutreachError::DuplicateSend { org_key, address }) => {
                // Success no-op: the dedup gate already covered this pair.
                info!("⏭  Already contacted {} for {}", address, org_key);
                summary.skipped_duplicates += 1;
            }
            Err(e) => {
                error!("❌ Failed to send to {}: {}", address, e);
                summary.failed += 1;
                if let Err(e) = database::record_sent(pool, &result.org_key, address, "failed").await
                {
                    error!("Could not record failed send for {}: {}", address, e);
                }
            }
        }
    }

    Ok(summary)
}

async fn send_one(
    pool: &DbPool,
    transport: &dyn SendTransport,
    generator: &dyn MessageGenerator,
    throttle: &SendThrottle,
    retry: &RetryPolicy,
    result: &OutreachResult,
    address: &str,
) -> Result<SendReceipt> {
    if database::has_sent(pool, &result.org_key, address).await? {
        return Err(OutreachError::DuplicateSend {
            org_key: result.org_key.clone(),
            address: address.to_string(),
        });
    }

    let contact_name = result
        .contact_name
        .clone()
        .unwrap_or_else(|| name_from_address(address));
    let message = generator
        .generate(&contact_name, &result.organization.name)
        .await?;

    throttle.acquire().await;
    let receipt = retry
        .run("send", || {
            transport.send(address, &message.subject, &message.body)
        })
        .await?;
    database::record_sent(pool, &result.org_key, address, "sent").await?;
    Ok(receipt)
}

/// "amy.salazar@acme.io" -> "Amy Salazar"; greeting fallback when discovery
/// produced an address but no name.
fn name_from_address(address: &str) -> String {
    let local = address.split('@').next().unwrap_or_default();
    local
        .split(['.', '_', '-'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_a_greeting_name_from_the_address() {
        assert_eq!(name_from_address("amy.salazar@acme.io"), "Amy Salazar");
        assert_eq!(name_from_address("jsmith@acme.io"), "Jsmith");
        assert_eq!(name_from_address("first_last@acme.io"), "First Last");
    }
}

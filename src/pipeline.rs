use crate::config::Config;
use crate::crawl::{clean_text, CrawlController};
use crate::database::{self, DbPool};
use crate::discovery;
use crate::errors::{OutreachError, Result};
use crate::extract::SignalExtractor;
use crate::models::{
    CandidateOrigin, ContactSource, EmailCandidate, Organization, OutreachResult, OutreachStatus,
    Verdict,
};
use crate::patterns;
use crate::providers::{EmailVerifier, PageFetcher, SearchProvider};
use crate::score;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Everything one worker needs to process an organization. Shared state is
/// confined to the store behind the pool; the rest is read-only.
pub struct PipelineContext {
    pub config: Config,
    pub db_pool: DbPool,
    pub search: Arc<dyn SearchProvider>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub verifier: Option<Arc<dyn EmailVerifier>>,
    pub extractor: SignalExtractor,
    pub run_id: Uuid,
}

impl PipelineContext {
    pub fn new(
        config: Config,
        db_pool: DbPool,
        search: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn PageFetcher>,
        verifier: Option<Arc<dyn EmailVerifier>>,
    ) -> Self {
        let extractor = SignalExtractor::new(&config.discovery);
        Self {
            config,
            db_pool,
            search,
            fetcher,
            verifier,
            extractor,
            run_id: Uuid::new_v4(),
        }
    }
}

/// Process one input row. Failures never escape: a broken organization is
/// logged and reported with status `error` while the batch moves on.
pub async fn process_organization(ctx: &PipelineContext, record: Organization) -> OutreachResult {
    match process_inner(ctx, record.clone()).await {
        Ok(result) => result,
        Err(e) => {
            error!("Failed to process {}: {}", record.name, e);
            OutreachResult::new(record, OutreachStatus::Error, e.to_string())
        }
    }
}

async fn process_inner(ctx: &PipelineContext, record: Organization) -> Result<OutreachResult> {
    let name = record.name.trim().to_string();
    if name.is_empty() {
        return Err(OutreachError::invalid_input("organization name is empty"));
    }

    if ctx.config.batch.skip_processed
        && database::has_processed(&ctx.db_pool, &record.key()).await?
    {
        info!("⏭  Skipping already-processed organization: {}", name);
        return Ok(OutreachResult::new(
            record,
            OutreachStatus::SkippedDuplicate,
            "already processed in a previous run",
        ));
    }

    // Resolve the domain, discovering one when the input row has none.
    let domain = match record.registrable_domain() {
        Some(domain) => Some(domain),
        None => {
            discovery::discover_domain(
                ctx.search.as_ref(),
                &ctx.config.retry,
                &ctx.config.discovery,
                &name,
            )
            .await
        }
    };
    let Some(domain) = domain else {
        warn!("Could not resolve a domain for: {}", name);
        let result = OutreachResult::new(
            record,
            OutreachStatus::NoDomainResolved,
            "no domain could be resolved",
        );
        finish(ctx, &result).await?;
        return Ok(result);
    };

    let organization = Organization::new(name.clone(), Some(domain.clone()));
    let org_key = organization.key();
    if ctx.config.batch.skip_processed
        && org_key != record.key()
        && database::has_processed(&ctx.db_pool, &org_key).await?
    {
        info!("⏭  Skipping already-processed organization: {}", name);
        return Ok(OutreachResult::new(
            organization,
            OutreachStatus::SkippedDuplicate,
            "already processed in a previous run",
        ));
    }

    // Primary source: search hits mentioning people at the organization.
    let found = discovery::search_contacts(
        ctx.search.as_ref(),
        &ctx.config.retry,
        &ctx.extractor,
        &ctx.config.discovery,
        &organization,
    )
    .await;
    let mut contacts = found.contacts;
    let mut observed = found.observed;

    // Secondary source: a bounded crawl of the organization's own pages.
    if ctx.config.crawl.max_pages > 0 {
        let mut seeds = discovery::seed_urls(&domain);
        seeds.extend(found.on_domain_urls);

        let controller = CrawlController::new(ctx.fetcher.as_ref(), &ctx.config.crawl);
        let outcome = controller.crawl(&domain, &seeds).await;
        if outcome.stop.aborted() {
            warn!(
                "Crawl of {} aborted ({}); continuing with what was found",
                domain,
                outcome.stop.as_str()
            );
        }

        let mut seen_names: HashSet<String> =
            contacts.iter().map(|c| c.full_name.to_lowercase()).collect();
        let mut seen_addresses: HashSet<String> =
            observed.iter().map(|o| o.address.clone()).collect();
        for page in &outcome.pages {
            let text = clean_text(&page.body);
            let extracted = ctx
                .extractor
                .extract(&text, &organization, ContactSource::CrawledPage);
            for contact in extracted.contacts {
                if contacts.len() < ctx.config.discovery.max_contacts
                    && seen_names.insert(contact.full_name.to_lowercase())
                {
                    contacts.push(contact);
                }
            }
            for email in extracted.observed {
                if seen_addresses.insert(email.address.clone()) {
                    observed.push(email);
                }
            }
        }
    }

    // Expand contacts into address candidates; observed addresses go in
    // directly and win dedup collisions against generated ones.
    let mut candidates: Vec<EmailCandidate> = Vec::new();
    let mut seen = HashSet::new();
    for email in &observed {
        if seen.insert(email.address.clone()) {
            candidates.push(EmailCandidate {
                address: email.address.clone(),
                contact: None,
                origin: CandidateOrigin::Observed {
                    context: email.context.clone(),
                },
                score: 0.0,
            });
        }
    }
    for contact in contacts.iter().take(ctx.config.discovery.max_contacts) {
        match patterns::generate(&contact.full_name, &domain) {
            Ok(addresses) => {
                for (pattern_index, address) in addresses
                    .into_iter()
                    .take(ctx.config.discovery.max_patterns_per_contact)
                    .enumerate()
                {
                    if seen.insert(address.clone()) {
                        candidates.push(EmailCandidate {
                            address,
                            contact: Some(contact.clone()),
                            origin: CandidateOrigin::Generated { pattern_index },
                            score: 0.0,
                        });
                    }
                }
            }
            Err(e) => debug!("Skipping patterns for {}: {}", contact.full_name, e),
        }
    }

    if candidates.is_empty() {
        let result = OutreachResult::new(
            organization,
            OutreachStatus::NoContactFound,
            "no contacts or addresses discovered",
        );
        finish(ctx, &result).await?;
        return Ok(result);
    }

    let mut verdicts: HashMap<String, Verdict> = HashMap::new();
    let mut ranked = score::rank(candidates, &ctx.config.scoring, &verdicts);

    // Verify only the leaders; a dead verifier degrades to Unknown.
    if let Some(verifier) = &ctx.verifier {
        for candidate in ranked.iter().take(ctx.config.discovery.verify_top) {
            let verdict = match ctx
                .config
                .retry
                .run("verify", || verifier.verify(&candidate.address))
                .await
            {
                Ok(verdict) => verdict,
                Err(e) => {
                    warn!("Verification degraded for {}: {}", candidate.address, e);
                    Verdict::Unknown
                }
            };
            verdicts.insert(candidate.address.clone(), verdict);
        }
        ranked = score::rank(ranked, &ctx.config.scoring, &verdicts);
    }

    let Some(best) = ranked.first().cloned() else {
        let result = OutreachResult::new(
            organization,
            OutreachStatus::NoContactFound,
            "every candidate was rejected by verification",
        );
        finish(ctx, &result).await?;
        return Ok(result);
    };

    info!(
        "✓ Best candidate for {}: {} (score {:.1})",
        name, best.address, best.score
    );
    let mut result = OutreachResult::new(
        organization,
        OutreachStatus::Found,
        format!("top of {} candidates", ranked.len()),
    );
    result.contact_name = best.contact.as_ref().map(|c| c.full_name.clone());
    result.email = Some(best.address);
    result.score = best.score;
    finish(ctx, &result).await?;
    Ok(result)
}

/// Persist the per-organization outcome and close the rerun gate.
async fn finish(ctx: &PipelineContext, result: &OutreachResult) -> Result<()> {
    database::record_best(&ctx.db_pool, result).await?;
    database::mark_processed(&ctx.db_pool, &result.org_key, result.status.as_str()).await?;
    Ok(())
}

#[derive(Debug, Default, Clone)]
pub struct BatchSummary {
    pub total: usize,
    pub found: usize,
    pub no_contact_found: usize,
    pub no_domain_resolved: usize,
    pub skipped_duplicate: usize,
    pub errors: usize,
}

impl BatchSummary {
    fn record(&mut self, status: OutreachStatus) {
        self.total += 1;
        match status {
            OutreachStatus::Found => self.found += 1,
            OutreachStatus::NoContactFound => self.no_contact_found += 1,
            OutreachStatus::NoDomainResolved => self.no_domain_resolved += 1,
            OutreachStatus::SkippedDuplicate => self.skipped_duplicate += 1,
            OutreachStatus::Error => self.errors += 1,
        }
    }

    pub fn print(&self) {
        println!("\n📊 Batch Summary");
        println!("━━━━━━━━━━━━━━━━━━━━━");
        println!("   Processed:          {}", self.total);
        println!("   ✓ Found:            {}", self.found);
        println!("   No contact found:   {}", self.no_contact_found);
        println!("   No domain resolved: {}", self.no_domain_resolved);
        println!("   Skipped duplicates: {}", self.skipped_duplicate);
        println!("   Errors:             {}", self.errors);
    }
}

/// Run the batch through a bounded worker pool. Organizations are
/// independent; no ordering is guaranteed. Cancellation stops issuing new
/// work and lets in-flight organizations finish normally.
pub async fn run_batch(
    ctx: Arc<PipelineContext>,
    records: Vec<Organization>,
    cancel: watch::Receiver<bool>,
) -> (Vec<OutreachResult>, BatchSummary) {
    let total = records.len();
    info!(
        "🚀 Starting run {} over {} organizations ({} workers)",
        ctx.run_id,
        total,
        ctx.config.batch.concurrency.max(1)
    );

    let semaphore = Arc::new(Semaphore::new(ctx.config.batch.concurrency.max(1)));
    let mut set = JoinSet::new();
    for record in records {
        if *cancel.borrow() {
            warn!("Cancellation requested; not starting remaining organizations");
            break;
        }
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore closed");
        if *cancel.borrow() {
            warn!("Cancellation requested; not starting remaining organizations");
            break;
        }
        let ctx = ctx.clone();
        set.spawn(async move {
            let _permit = permit;
            process_organization(&ctx, record).await
        });
    }

    let mut results = Vec::new();
    let mut summary = BatchSummary::default();
    let progress_interval = ctx.config.logging.progress_interval.max(1);
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(result) => {
                summary.record(result.status);
                if summary.total % progress_interval == 0 {
                    info!("Progress: {}/{} organizations", summary.total, total);
                }
                results.push(result);
            }
            Err(e) => {
                error!("Worker task failed: {}", e);
                summary.total += 1;
                summary.errors += 1;
            }
        }
    }

    info!(
        "🏁 Batch complete: {}/{} organizations with a contact found",
        summary.found, summary.total
    );
    (results, summary)
}

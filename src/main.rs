use contact_finder::config::{load_config, Config};
use contact_finder::database::{create_db_pool, fetch_results};
use contact_finder::errors::Result;
use contact_finder::input::read_organizations;
use contact_finder::outreach::run_outreach;
use contact_finder::pipeline::{run_batch, PipelineContext};
use contact_finder::providers::{
    EmailVerifier, HtmlSearchProvider, HttpFetcher, PeopleApiVerifier, RestTransport,
    TemplateGenerator, TransportConfig,
};
use contact_finder::rate_limit::SendThrottle;
use contact_finder::export;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let config = match load_config("config.yml").await {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load config.yml: {}. Using defaults.", e);
            Config::default()
        }
    };

    // Setup logging
    let directive = format!("contact_finder={}", config.logging.level);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(directive.parse().expect("invalid logging.level"))
                .add_directive("hyper=warn".parse().expect("static directive")),
        )
        .init();

    tokio::fs::create_dir_all(&config.output.directory).await?;

    info!("Initializing database...");
    let db_pool = create_db_pool(&config.output.database_path).await?;

    let organizations = read_organizations(&config.input.path).await?;

    let verifier = PeopleApiVerifier::from_env().map(|v| {
        info!("Email verification enabled");
        Arc::new(v) as Arc<dyn EmailVerifier>
    });
    if verifier.is_none() {
        warn!("Email verification disabled - set VERIFIER_API_KEY to enable it");
    }

    let ctx = Arc::new(PipelineContext::new(
        config.clone(),
        db_pool.clone(),
        Arc::new(HtmlSearchProvider::new()),
        Arc::new(HttpFetcher::new()),
        verifier,
    ));

    // Ctrl+C stops issuing new organizations; in-flight work completes.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let mut batch = tokio::spawn(run_batch(ctx, organizations, cancel_rx));
    let (results, summary) = tokio::select! {
        joined = &mut batch => joined.expect("batch task panicked"),
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, finishing in-flight organizations...");
            let _ = cancel_tx.send(true);
            batch.await.expect("batch task panicked")
        }
    };

    if config.outreach.enabled {
        let transport = RestTransport::new(TransportConfig::from_env()?);
        let generator = TemplateGenerator::from_env();
        let throttle = SendThrottle::new(Duration::from_millis(config.outreach.min_send_delay_ms));
        let outreach_summary = run_outreach(
            &db_pool,
            &transport,
            &generator,
            &throttle,
            &config.retry,
            &config.outreach,
            &results,
        )
        .await?;
        outreach_summary.print();
    }

    let rows = fetch_results(&db_pool).await?;
    let results_path = format!(
        "{}/{}",
        config.output.directory, config.output.results_filename
    );
    export::write_results_csv(&rows, &results_path)?;

    summary.print();
    println!("\nResults saved to: {}", results_path);

    Ok(())
}

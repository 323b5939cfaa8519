use anyhow::{bail, Context};
use dotenvy::dotenv;
use log::{info, warn};
use std::sync::Arc;

use petwash::core::bootstrap::seed_reference_data;
use petwash::core::config::AppConfig;
use petwash::core::shared::state::AppState;
use petwash::core::shared::utils::{create_pool, run_migrations};
use petwash::invoicing::{HttpItaClient, ItaClient};
use petwash::main_module::run_server;
use petwash::security::auth::{issue_token, ADMIN_ROLE};

const USAGE: &str = "Usage: petwash [serve | seed | token <subject> [--ttl-hours N]]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .write_style(env_logger::WriteStyle::Always)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config = AppConfig::load().context("failed to load configuration")?;

    match args.get(1).map(String::as_str) {
        None | Some("serve") => serve(config).await,
        Some("seed") => seed(&config).await,
        Some("token") => token(&config, &args[2..]),
        Some("--help") | Some("-h") => {
            println!("{USAGE}");
            Ok(())
        }
        Some(other) => bail!("unknown command `{other}`\n{USAGE}"),
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    info!("Starting Pet Wash back office {}", env!("CARGO_PKG_VERSION"));

    let pool = create_pool(&config.database).context("failed to create database pool")?;
    let migration_pool = pool.clone();
    tokio::task::spawn_blocking(move || run_migrations(&migration_pool))
        .await?
        .map_err(|e| anyhow::anyhow!("failed to run migrations: {e}"))?;

    if !config.ita.is_configured() {
        warn!("ITA credentials are not configured; invoices requiring allocation will fail");
    }
    let ita_client: Arc<dyn ItaClient> = Arc::new(
        HttpItaClient::new(config.ita.clone()).context("failed to build ITA client")?,
    );

    let state = Arc::new(AppState::new(pool, config, ita_client));
    run_server(state).await?;
    info!("Server stopped");
    Ok(())
}

async fn seed(config: &AppConfig) -> anyhow::Result<()> {
    let pool = create_pool(&config.database).context("failed to create database pool")?;
    let report = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        run_migrations(&pool).map_err(|e| anyhow::anyhow!("failed to run migrations: {e}"))?;
        let mut conn = pool.get()?;
        Ok(seed_reference_data(&mut conn)?)
    })
    .await??;
    println!(
        "Seeded {} countries and {} subscription plans",
        report.countries_inserted, report.plans_inserted
    );
    Ok(())
}

fn token(config: &AppConfig, args: &[String]) -> anyhow::Result<()> {
    let Some(subject) = args.first() else {
        bail!("missing subject\n{USAGE}");
    };
    let ttl_hours = match args.iter().position(|a| a == "--ttl-hours") {
        Some(idx) => args
            .get(idx + 1)
            .context("--ttl-hours needs a value")?
            .parse::<i64>()
            .context("--ttl-hours must be a whole number")?,
        None => 12,
    };
    if config.auth.jwt_secret.is_empty() {
        bail!("auth.jwt_secret is not configured");
    }

    let token = issue_token(
        &config.auth.jwt_secret,
        subject,
        ADMIN_ROLE,
        chrono::Duration::hours(ttl_hours),
    )?;
    println!("{token}");
    Ok(())
}

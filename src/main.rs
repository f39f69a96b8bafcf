use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gazette::app::AppContext;
use gazette::cli::{commands, Cli, Commands};
use gazette::config::GazetteConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = GazetteConfig::load()?;
    let ctx = Arc::new(AppContext::new(config)?);
    ctx.hydrate_cache().await;

    match cli.command {
        Commands::Latest { page } => commands::latest(&ctx, page).await,
        Commands::Featured => commands::featured(&ctx).await,
        Commands::Category { id, page } => commands::category(&ctx, id, page).await,
        Commands::Search { query, page } => commands::search(&ctx, &query, page).await,
        Commands::Categories => commands::categories(),
        Commands::Daemon => commands::daemon(Arc::clone(&ctx)).await?,
    }

    if cli.stats {
        commands::print_stats(&ctx);
    }

    Ok(())
}

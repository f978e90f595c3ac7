use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod core;
mod credentials;
mod error;

use cli::Cli;
use core::Engine;
use error::CoverMeError;

#[tokio::main]
async fn main() {
    // A missing .env is fine
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    debug!("Starting cover-me v{}", env!("CARGO_PKG_VERSION"));
    if let Ok(path) = dotenv {
        debug!("Loaded environment from {}", path.display());
    }

    let engine = Engine::new(cli.config_dir.clone());

    if let Err(err) = cli.execute(engine).await {
        report(&err);
        std::process::exit(1);
    }
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<CoverMeError>() {
        Some(e) => {
            eprintln!("❌ {}: {}", e.kind_label(), e);
            let hints = e.hint();
            if !hints.is_empty() {
                eprintln!("\n💡 Try:");
                for hint in hints {
                    eprintln!("   • {}", hint);
                }
            }
        }
        None => eprintln!("❌ Error: {:#}", err),
    }
}

use clap::Parser;
use eventcache::app::App;
use eventcache::cli::{Args, Command};
use eventcache::config::Config;
use eventcache::logging::setup_logging;
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config and setup logging before App::new() so startup logs are never silently dropped
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    setup_logging(&config, args.tracing);

    let command = args.command.unwrap_or(Command::Serve);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("GIT_COMMIT_SHORT"),
        command = ?command,
        environment = if cfg!(debug_assertions) {
            "development"
        } else {
            "production"
        },
        "starting eventcache"
    );

    let app = match App::new(config).await {
        Ok(app) => app,
        Err(e) => {
            error!(error = ?e, "Failed to initialize application");
            return ExitCode::FAILURE;
        }
    };

    match command {
        Command::Serve => app.serve().await,
        Command::Prime => match app.prime_once().await {
            Ok(report) => {
                info!(
                    primed = report.primed,
                    failed = report.failed,
                    "one-shot priming finished"
                );
                if report.failed == 0 {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                }
            }
            Err(e) => {
                error!(error = ?e, "Priming failed");
                ExitCode::FAILURE
            }
        },
    }
}

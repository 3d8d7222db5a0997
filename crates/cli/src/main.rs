use anyhow::Context;
use clap::{Parser, Subcommand};
use shelf_kernel::settings::Settings;

/// Command-line entrypoint for the SHELF book catalogue
#[derive(Debug, Parser)]
#[command(name = "shelf", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Print the merged OpenAPI document as JSON
    Openapi {
        /// Emit compact JSON instead of pretty-printed output
        #[arg(long)]
        compact: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let settings = load_settings()?;
            shelf_app::bootstrap::serve(settings).await
        }
        Command::Migrate => {
            let settings = load_settings()?;
            let applied = shelf_app::bootstrap::migrate(&settings).await?;
            tracing::info!(applied, "migrations complete");
            println!("applied {} migration(s)", applied);
            Ok(())
        }
        Command::Openapi { compact } => {
            let spec = shelf_app::bootstrap::openapi()?;
            let rendered = if compact {
                serde_json::to_string(&spec)?
            } else {
                serde_json::to_string_pretty(&spec)?
            };
            println!("{}", rendered);
            Ok(())
        }
    }
}

/// Settings plus logging; only commands that talk to the outside world need them.
fn load_settings() -> anyhow::Result<Settings> {
    let settings = Settings::load().with_context(|| "failed to load SHELF settings")?;
    shelf_telemetry::init(&settings.telemetry).context("failed to initialize telemetry")?;
    Ok(settings)
}

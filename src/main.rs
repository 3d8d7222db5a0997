use anyhow::Context;
use shelf_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load SHELF settings")?;

    shelf_telemetry::init(&settings.telemetry).context("failed to initialize telemetry")?;

    shelf_app::bootstrap::serve(settings).await
}

mod domain;
mod infrastructure;

use domain::settings::SettingsService;
use infrastructure::bluetooth::DiscoveryConfig;
use infrastructure::logging;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = SettingsService::new()?;
    let _guard = logging::init_logger(&settings.get().log_settings)?;
    info!("Starting NB2 collector");
    info!("Settings: {}", settings.path().display());

    let config = DiscoveryConfig::from(settings.get());
    run(config).await
}

#[cfg(windows)]
async fn run(config: DiscoveryConfig) -> anyhow::Result<()> {
    use infrastructure::bluetooth::winrt::WinRtTransport;
    use infrastructure::bluetooth::DiscoveryService;

    let mut service = DiscoveryService::new(WinRtTransport::new(), config);
    service.run().await
}

#[cfg(not(windows))]
async fn run(_config: DiscoveryConfig) -> anyhow::Result<()> {
    Err(infrastructure::bluetooth::error::BleError::TransportUnavailable(
        "no Bluetooth LE transport for this platform".to_string(),
    )
    .into())
}

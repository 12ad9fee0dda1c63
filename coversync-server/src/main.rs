use std::env;
use std::sync::Arc;

use coversync_server::configs::Settings;
use coversync_server::run;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = env::args().nth(1);
    let settings = Arc::new(Settings::with_default_file(config_path.as_deref())?);

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let app_name = env!("CARGO_PKG_NAME").replace('-', "_");
            let level = settings.logger.level.as_str();

            format!("{app_name}={level},tower_http={level}").into()
        }))
        .init();

    run(&settings).await
}

use std::sync::Arc;

use warden_core::config::Config;

#[tokio::main]
async fn main() -> Result<(), warden_core::Error> {
    warden_core::logging::init("warden");

    let cfg = Arc::new(Config::load()?);

    warden_telegram::router::run_polling(cfg)
        .await
        .map_err(|e| warden_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}

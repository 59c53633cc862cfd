use ttl::config::LedgerConfig;
use ttl::Result;

use std::path::Path;

use log::LevelFilter;
use simple_logger::SimpleLogger;

pub fn configure_app() -> Result {
    SimpleLogger::new()
        .with_level(LevelFilter::Warn)
        .env()
        .init()?;

    return Ok(());
}

pub fn load_ledger_config(path: Option<&Path>) -> Result<LedgerConfig> {
    let config = match path {
        Some(path) => LedgerConfig::load(path)?,
        None => LedgerConfig::default(),
    };

    log::debug!("Using ledger config: {config:?}");

    return Ok(config);
}

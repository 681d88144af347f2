//! Config Bootstrap - Main entry point
//!
//! Reads `configuration=<path>` from the command line (default
//! `config/configuration.properties`), prints the merged configuration and
//! keeps reporting reloads until Ctrl-C.

use bootconf::telemetry::{init_tracing, LogFormat, DEFAULT_DIRECTIVE};
use bootconf::{ArgumentTable, ConfigMap, ConfigurationRetriever, FallbackStrategy};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ArgumentTable::from_env();

    let format = match args.get_arg("log-format") {
        Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
        _ => LogFormat::Text,
    };
    if let Err(e) = init_tracing(DEFAULT_DIRECTIVE, format) {
        eprintln!("{e}");
    }

    let defaults = ConfigMap::from([("language", "en"), ("eula.accepted", "0")]);
    let strategy = FallbackStrategy::from_defaults_with(defaults, || {
        info!("No configuration file, default values will be written");
    });
    let retriever = ConfigurationRetriever::new(strategy);
    let config = retriever.retrieve_from_args(&args)?;

    for (key, value) in config.iter() {
        println!("{key}={value}");
    }

    if args.has_flag(bootconf::args::CONFIGURATION_CHECK) {
        return Ok(());
    }

    let Some(mut watcher) = retriever.watcher(|| info!("Configuration reloaded")) else {
        warn!("No configuration path resolved, nothing to watch");
        return Ok(());
    };
    let interrupter = watcher.interrupter();

    let watch = tokio::task::spawn_blocking(move || watcher.inspect());

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    interrupter.interrupt();
    watch.await?;

    Ok(())
}

use anyhow::Result;
use clap::Parser;
use gallery_prep::cli::{Cli, Command};
use gallery_prep::config::AppConfig;
use gallery_prep::{processor, web_server};
use log::info;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::new(&cli.config_dir, cli.overrides())?;

    env_logger::Builder::new()
        .filter_level(config.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    match cli.command {
        Command::Serve(_) => {
            info!("Starting gallery_prep web server");
            if let Err(e) = web_server::start_web_server(Arc::new(config)).await {
                log::error!("Web server error: {}", e);
                return Err(e.into());
            }
        }
        Command::Prepare(_) => {
            info!("Starting gallery preparation");
            let prepare = config.prepare.clone();
            let report = tokio::task::spawn_blocking(move || processor::run_prepare(&prepare)).await??;
            info!(
                "Prepared {} images: {} thumbnails written, {} metadata entries extracted, {} failures",
                report.images, report.thumbnails_written, report.metadata_extracted, report.failures
            );
        }
    }

    info!("gallery_prep finished");
    Ok(())
}

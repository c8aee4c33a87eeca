#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_errors_doc)]

#[macro_use]
mod modules;

include_modules!();

use crate::app::{AppContext, Console};
use crate::model::Config;
use crate::player::CommandPlayerBackend;
use crate::repository::SessionRepository;
use crate::utils::network::request::create_client;
use crate::utils::{init_logger, read_config, resolve_env_var, set_sanitize_sensitive_info, CONFIG_FILE};
use chrono::{DateTime, Utc};
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;

#[derive(Parser)]
#[command(name = "tuliplay")]
#[command(version)]
#[command(about = "M3U playlist player", long_about = None)]
struct Args {
    /// The config file
    #[arg(short = 'c', long = "config")]
    config_file: Option<String>,

    /// The playlist url, remembered for the next start
    #[arg(short = 'p', long = "playlist")]
    playlist: Option<String>,

    /// log level
    #[arg(short = 'l', long = "log-level", default_missing_value = "info")]
    log_level: Option<String>,

    /// The data directory, overrides the config
    #[arg(short = 'd', long = "data-dir")]
    data_dir: Option<String>,
}

const VERSION: &str = env!("CARGO_PKG_VERSION");
const BUILD_TIMESTAMP: Option<&str> = option_env!("VERGEN_BUILD_TIMESTAMP");

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config_file = resolve_env_var(args.config_file.as_deref().unwrap_or(CONFIG_FILE));
    init_logger(args.log_level.as_ref(), &config_file);

    info!("Version: {VERSION}");
    if let Some(bts) = BUILD_TIMESTAMP.and_then(|ts| ts.parse::<DateTime<Utc>>().ok()).map(|datetime| datetime.format("%Y-%m-%d %H:%M:%S %Z").to_string()) {
        info!("Build time: {bts}");
    }

    let mut config = read_config(&config_file).unwrap_or_else(|err| exit!("{}", err));
    if let Some(data_dir) = args.data_dir.as_ref().map(|d| resolve_env_var(d)).filter(|d| !d.trim().is_empty()) {
        config.data_dir = data_dir.trim().to_string();
    }
    set_sanitize_sensitive_info(config.sanitize_sensitive_info());
    print_info(&config, &config_file);

    let sessions = SessionRepository::new(&PathBuf::from(&config.data_dir));

    let client = create_client(&config).build().unwrap_or_else(|err| {
        error!("Failed to build client {err}");
        reqwest::Client::new()
    });
    let backend = Arc::new(CommandPlayerBackend::new(config.player.clone()));
    let mut ctx = AppContext::new(Arc::new(config), client, backend, sessions);
    let autoload = ctx.restore_playlist_url(args.playlist.as_deref());

    let console = Console::new(ctx, std::io::stdout());
    if let Err(err) = console.run(BufReader::new(tokio::io::stdin()), autoload).await {
        exit!("Console failed: {err}");
    }
}

fn print_info(config: &Config, config_file: &str) {
    info!("Config file: {config_file}");
    info!("Data dir: {}", config.data_dir);
    info!("Player: {}", config.player.command);
}

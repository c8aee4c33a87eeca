use crate::model::LogLevelConfig;
use crate::utils::config_file_reader;
use env_logger::{Builder, Target};
use log::{error, info, LevelFilter};
use std::fs::File;

pub const LOG_ENV_VAR: &str = "TULIPLAY_LOG";

const LOG_ERROR_LEVEL_MOD: &[&str] = &[
    "reqwest::async_impl::client",
    "reqwest::connect",
    "hyper_util::client",
    "rustls",
];

fn get_log_level(log_level: &str) -> LevelFilter {
    match log_level.trim().to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        // "info" => LevelFilter::Info,
        _ => LevelFilter::Info,
    }
}

/// Splits a log level expression like `info,tuliplay::player=debug` into
/// a default level and per module levels.
fn parse_log_levels(log_level: &str) -> (Option<LevelFilter>, Vec<(String, LevelFilter)>) {
    let mut default_level = None;
    let mut module_levels = vec![];
    for pair in log_level.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if pair.contains('=') {
            let mut kv_iter = pair.split('=').map(str::trim);
            if let (Some(module), Some(level)) = (kv_iter.next(), kv_iter.next()) {
                module_levels.push((module.to_string(), get_log_level(level)));
            }
        } else {
            default_level = Some(get_log_level(pair));
        }
    }
    (default_level, module_levels)
}

pub fn init_logger(user_log_level: Option<&String>, config_file: &str) {
    let env_log_level = std::env::var(LOG_ENV_VAR).ok();

    let mut log_builder = Builder::from_default_env();
    // stdout belongs to the console
    log_builder.target(Target::Stderr);

    // priority  CLI-Argument, Env-Var, Config, Default
    let log_level = user_log_level
        .map(std::string::ToString::to_string) // cli-argument
        .or(env_log_level) // env
        .or_else(|| {               // config
            File::open(config_file).ok()
                .and_then(|file| serde_yaml::from_reader::<_, LogLevelConfig>(config_file_reader(file, true))
                    .map_err(|e| error!("Failed to parse log config file: {e}"))
                    .ok())
                .and_then(|cfg| cfg.log.and_then(|l| l.log_level))
        })
        .unwrap_or_else(|| "info".to_string()); // Default

    let (default_level, module_levels) = parse_log_levels(&log_level);
    let mut log_levels = vec![];
    if let Some(level) = default_level {
        log_builder.filter_level(level);
        log_levels.push(level.to_string());
    } else if module_levels.is_empty() {
        log_builder.filter_level(LevelFilter::Info);
        log_levels.push(LevelFilter::Info.to_string());
    }
    for (module, level) in &module_levels {
        log_builder.filter_module(module, *level);
        log_levels.push(format!("{module}={level}"));
    }
    for module in LOG_ERROR_LEVEL_MOD {
        log_builder.filter_module(module, LevelFilter::Error);
    }
    log_builder.init();
    info!("Log Level {}", &log_levels.join(", "));
}

use crate::error::{info_err, TuliplayError};
use crate::model::Config;
use crate::utils::CONSTANTS;
use log::{error, info};
use std::env;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::Path;

enum EitherReader<L, R> {
    Left(L),
    Right(R),
}

impl<L: Read, R: Read> Read for EitherReader<L, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            EitherReader::Left(reader) => reader.read(buf),
            EitherReader::Right(reader) => reader.read(buf),
        }
    }
}

pub fn file_reader<R>(r: R) -> BufReader<R>
where
    R: Read,
{
    BufReader::new(r)
}

/// Returns a reader over the config file. With `resolve_env` all `${env:VAR}`
/// placeholders are substituted before the yaml parser sees the content.
pub fn config_file_reader(file: File, resolve_env: bool) -> impl Read
{
    if resolve_env {
        let mut content = String::new();
        if let Err(err) = file_reader(file).read_to_string(&mut content) {
            error!("Failed to read config file: {err}");
        }
        EitherReader::Left(Cursor::new(resolve_env_var(&content)))
    } else {
        EitherReader::Right(file_reader(file))
    }
}

/// Reads the yaml config. A missing file is not an error, defaults are used.
pub fn read_config(config_file: &str) -> Result<Config, TuliplayError> {
    let path = Path::new(config_file);
    if !path.exists() {
        info!("Config file {config_file} not found, using defaults");
        let mut config = Config::default();
        config.prepare()?;
        return Ok(config);
    }
    match File::open(path) {
        Ok(file) => {
            match serde_yaml::from_reader::<_, Config>(config_file_reader(file, true)) {
                Ok(mut config) => {
                    config.prepare()?;
                    Ok(config)
                }
                Err(err) => Err(info_err!("Can't read the config file: {config_file}: {err}")),
            }
        }
        Err(err) => Err(info_err!("Can't read the config file: {config_file}: {err}")),
    }
}

pub fn resolve_env_var(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    CONSTANTS.re_env_var.replace_all(value, |caps: &regex::Captures| {
        let var_name = &caps["var"];
        env::var(var_name).unwrap_or_else(|e| {
            error!("Could not resolve env var '{var_name}': {e}");
            format!("${{env:{var_name}}}")
        })
    }).to_string()
}

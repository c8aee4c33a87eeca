mod config;
mod playlist;

pub use self::config::*;
pub use self::playlist::*;

mod tuliplay_error;

pub use self::tuliplay_error::*;

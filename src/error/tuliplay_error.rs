use std::error::Error;
use std::fmt::{Display, Formatter, Result};
use crate::utils::sanitize_sensitive_info;

#[macro_export]
macro_rules! notify_err {
    ($($arg:tt)*) => {
        $crate::error::TuliplayError::new($crate::error::TuliplayErrorKind::Notify, format!($($arg)*))
    };
}

pub use notify_err;

#[macro_export]
macro_rules! notify_err_res {
    ($($arg:tt)*) => {
        Err($crate::error::TuliplayError::new($crate::error::TuliplayErrorKind::Notify, format!($($arg)*)))
    };
}

pub use notify_err_res;

#[macro_export]
macro_rules! info_err {
    // forwards the format arguments and wraps them into an Info error
    ($($arg:tt)*) => {
        $crate::error::TuliplayError::new($crate::error::TuliplayErrorKind::Info, format!($($arg)*))
    };
}

pub use info_err;

#[macro_export]
macro_rules! info_err_res {
    ($($arg:tt)*) => {
        Err($crate::error::TuliplayError::new($crate::error::TuliplayErrorKind::Info, format!($($arg)*)))
    };
}

pub use info_err_res;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TuliplayErrorKind {
    // only logged
    Info,
    Notify, // shown to the user on the console
}

#[derive(Debug)]
pub struct TuliplayError {
    pub kind: TuliplayErrorKind,
    pub message: String,
}

impl TuliplayError {
    pub const fn new(kind: TuliplayErrorKind, message: String) -> Self {
        Self { kind, message }
    }
}

impl Display for TuliplayError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(f, "Tuliplay error: {}", self.message)
    }
}

impl Error for TuliplayError {}

pub fn to_io_error<E>(err: E) -> std::io::Error
where
    E: std::error::Error,
{ std::io::Error::other(sanitize_sensitive_info(&err.to_string())) }

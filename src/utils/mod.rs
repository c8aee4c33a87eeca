mod constants;
mod default_utils;
mod file;
mod logging;
pub mod network;
mod sys_utils;
mod url_utils;

pub use self::constants::*;
pub use self::default_utils::*;
pub use self::file::*;
pub use self::logging::*;
pub use self::sys_utils::*;
pub use self::url_utils::*;

#[macro_export]
macro_rules! debug_if_enabled {
    ($fmt:expr, $( $args:expr ),*) => {
        if log::log_enabled!(log::Level::Debug) {
            log::log!(log::Level::Debug, $fmt, $($args),*);
        }
    };

    ($txt:expr) => {
        if log::log_enabled!(log::Level::Debug) {
            log::log!(log::Level::Debug, $txt);
        }
    };
}

pub use debug_if_enabled;

mod app_context;
mod console;

pub use self::app_context::*;
pub use self::console::*;

mod session_repository;

pub use self::session_repository::*;

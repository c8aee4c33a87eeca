#[macro_export]
macro_rules! include_modules {
    () => {
        extern crate core;
        extern crate env_logger;
        pub mod app;
        pub mod error;
        pub mod model;
        pub mod player;
        pub mod processing;
        pub mod repository;
        pub mod utils;
    }
}

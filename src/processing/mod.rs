pub mod parser;
pub mod playlist_store;
pub mod list_renderer;

mod player_backend;
mod controller;
mod command_player;

pub use self::player_backend::*;
pub use self::controller::*;
pub use self::command_player::*;

/// clipdeck - language-learning card platform backend
///
/// Card catalog, comments with voting, likes, saved-card SRS states and
/// admin media migrations, served over a JSON HTTP API.

pub mod api;
pub mod config;
pub mod core;
pub mod database;


pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

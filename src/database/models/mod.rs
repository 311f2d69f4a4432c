//! Database Models
//!
//! Record types mapped to the SQLite schema via `sqlx::FromRow`.

mod content;
mod social;

pub use content::*;
pub use social::*;

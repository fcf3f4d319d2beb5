mod config;
mod error;
mod models;

pub use self::config::*;
pub use error::*;
pub use models::*;

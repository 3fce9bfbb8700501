pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod providers;
pub mod storage;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;

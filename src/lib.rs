pub mod agent;
pub mod config;
pub mod engine;
pub mod error;
pub mod kernel;
pub mod lifecycle;
pub mod problems;
pub mod types;

pub use config::Config;
pub use error::{EcoError, EcoResult};
pub use types::*;

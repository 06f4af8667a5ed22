pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod planner;
pub mod retrieve;
pub mod retry;
pub mod verification;

pub use config::Config;
pub use error::Era5DlError;

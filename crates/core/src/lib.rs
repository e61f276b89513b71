pub mod chunk;
pub mod config;

pub use chunk::*;
pub use config::Config;

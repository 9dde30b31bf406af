pub mod config;
pub mod entities;
pub mod ports;

pub use config::*;
pub use entities::*;
pub use ports::*;

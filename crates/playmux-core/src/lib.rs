pub mod backend;
pub mod builtin;
pub mod config;
pub mod error;
pub mod events;
pub mod factory;
pub mod manager;
pub mod outputs;
pub mod plugin;
pub mod protocol;
pub mod resource;
pub mod session;
pub mod timer;
pub mod watchdog;

#[cfg(test)]
mod testing;

pub use error::{PlayerError, PlayerResult};

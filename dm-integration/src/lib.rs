pub mod bindings;
pub mod core_plugin;
pub mod error;
pub mod fabric;
pub mod hooks;
pub mod integrator;
pub mod topology;

#[cfg(test)]
pub(crate) mod testing;

pub use error::DmError;

pub mod catalog;
pub mod config;
pub mod db;
pub mod logging;
pub mod messaging;
pub mod session;
pub mod stats;
pub mod validation;

#[cfg(feature = "uniffi")]
pub mod runtime;

#[cfg(feature = "uniffi")]
uniffi::setup_scaffolding!();
#[cfg(feature = "uniffi")]
pub mod uniffi_interface;

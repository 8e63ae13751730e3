//! Mobile bridge. Every export is synchronous and runs on the global runtime.

pub mod errors;
pub mod logging;
pub mod objects;
pub mod session;

//! Ownership of live sessions.

pub mod registry;

pub use registry::SessionRegistry;

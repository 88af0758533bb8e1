//! Infrastructure services for the API server.

pub mod kv;
pub mod sessions;
pub mod settings;
pub mod share;

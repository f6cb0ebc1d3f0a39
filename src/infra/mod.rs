//! Infrastructure layer
//!
//! Filesystem storage of installed releases, platform directories and the
//! device sources used by discovery.

pub mod dirs;
pub mod filesystem;
pub mod network;
pub mod serial;
pub mod store;

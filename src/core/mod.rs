//! Core business logic
//!
//! Catalog model, reference resolution, dependency walking and the install
//! lifecycle live here, together with device discovery and board attach.
//! Filesystem and network access go through [`crate::infra`].
//!
//! # Submodules
//!
//! - [`catalog`] - Packages, platforms, tools, libraries and boards
//! - [`resolver`] - Release references and their resolution
//! - [`dependencies`] - Tool dependency closure of a platform
//! - [`install`] / [`uninstall`] - Lifecycle operations
//! - [`discovery`] - Background device discovery
//! - [`attach`] - Board locator resolution and sketch attach

pub mod attach;
pub mod catalog;
pub mod dependencies;
pub mod discovery;
pub mod fqbn;
pub mod global_config;
pub mod index;
pub mod install;
pub mod instance;
pub mod progress;
pub mod resolver;
pub mod sketch;
pub mod uninstall;
pub mod version;

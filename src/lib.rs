//! Boardman - board platform, tool and library manager
//!
//! Installs and removes board platforms together with the toolchains they
//! depend on, keeps shared tools alive while any installed platform needs
//! them, and attaches sketches to boards found on serial ports or the
//! network.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Catalog model, lifecycle, discovery and attach
//! - [`infra`] - Install store, directories and device sources
//! - [`config`] - Defaults and constants
//! - [`error`] - Error types

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;

//! Storage infrastructure: configuration file loading.
//!
//! The `config` sub-module reads the TOML configuration file from the XDG
//! config directory or an explicit path, and provides defaults when the file
//! does not exist.

pub mod config;

//! Command implementations for the worktrack CLI.
//!
//! - `config` - Configuration file management (init, path, validate)
//! - `run` - Interactive tracking console

pub(crate) mod config;
pub(crate) mod run;

pub(crate) use config::*;
pub(crate) use run::*;

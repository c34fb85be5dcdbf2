//! stratus-lib: Core types and logic for stratus
//!
//! This crate provides everything the `stratus` CLI drives:
//! - `Project`: settings, resources and the reference registry
//! - `build`: the staged pipeline writing numbered template artifacts
//! - `execute`: applying and deleting those artifacts against remote stacks
//! - `extension`: the callback protocol of custom resource handlers

pub mod aws;
pub mod build;
pub mod config;
pub mod consts;
pub mod error;
pub mod execute;
pub mod extension;
pub mod invoke;
pub mod lrn;
pub mod package;
pub mod placeholder;
pub mod project;
pub mod registry;
pub mod settings;
pub mod template;
pub mod util;

pub use error::{Error, ErrorKind, Result};

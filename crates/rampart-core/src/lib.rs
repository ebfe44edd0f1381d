//! Shared settings, route constants and core errors for the rampart workspace.

pub mod config;
pub mod constants;
pub mod error;

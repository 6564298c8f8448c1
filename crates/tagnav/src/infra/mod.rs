//! Infrastructure adapters for processes, git, and configuration.

pub mod config;
pub mod git;
pub mod process;

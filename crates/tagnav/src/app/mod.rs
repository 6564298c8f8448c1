//! Application layer orchestrating tag lookup, history, and generation.

pub mod fallback;
pub mod history;
pub mod navigation;
pub mod project;
pub mod search;
pub mod sources;

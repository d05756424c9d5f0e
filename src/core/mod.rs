//! Core module - Data model, configuration, persistence and session coordination

pub mod archive;
pub mod artifact;
pub mod config;
pub mod events;
pub mod project;
pub mod sessions;
pub mod snapshot;
pub mod surface;

//! Avatalk Library
//!
//! Core modules for the Avatalk talking-avatar controller.

pub mod audio;
pub mod config;
pub mod controller;
pub mod conversation;
pub mod error;
pub mod matcher;
pub mod playback;
pub mod recognition;
pub mod retry;

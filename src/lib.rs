//! Bulk uploader for Discord channels.
//!
//! Files are scanned from local directories, packed into batches that respect
//! the channel's per-message limits, and uploaded batch by batch through
//! Discord's attachment upload flow.

pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod report;
pub mod scanner;
pub mod security;
pub mod uploader;

// ABOUTME: Library module for drush-reload
// ABOUTME: Exports all core functionality for use in binary and tests

pub mod alias;
pub mod commands;
pub mod config;
pub mod drush;
pub mod error;
pub mod migration;
pub mod progress;
pub mod tables;
pub mod utils;

pub use error::ReloadError;

// Social feed: accounts, posts, follows, likes, comments, direct messages and notifications.

// Configuration and shared state
pub mod app_state;
pub mod config;

// Persistence and blob storage
pub mod database;
pub mod media;
pub mod models;

// Domain operations
pub mod forms;
pub mod services;
pub mod viewer;

// HTTP surface
pub mod handlers;
pub mod pages;

// Common utilities
pub mod error;

// Re-exports for convenience
pub use error::{AppError, AppResult};

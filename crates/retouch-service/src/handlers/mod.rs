//! HTTP request handlers.

pub mod credits;
pub mod edits;
pub mod health;
pub mod payments;
pub mod projects;
pub mod webhooks;

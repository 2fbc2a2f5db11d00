//! HTTP route handlers for the health server.

pub mod health;

//! # TaskTrail API Server Library
//!
//! HTTP surface of TaskTrail: signup, login, per-user records with an audit
//! trail, and admin-only user listing.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Handler error type, mapped to responses by the shared classifier
//! - `extract`: Request body extraction with validation
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

/// API route handlers
///
/// - `health`: Health check endpoint
/// - `auth`: Signup and login
/// - `records`: The caller's own records
/// - `admin`: Admin-only endpoints

pub mod admin;
pub mod auth;
pub mod health;
pub mod records;

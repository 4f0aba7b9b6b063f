//! tideway - a non-blocking HTTP/1.1 static file server
//!
//! Core library: the per-connection request engine, credential actions and
//! the server shell that drives them.

pub mod auth;
pub mod config;
pub mod http;
pub mod server;

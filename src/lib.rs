#![doc = "The `todo_api` library crate."]
#![doc = ""]
#![doc = "Domain models, authentication, persistence, mail and routing for the to-do"]
#![doc = "service. The binary (`main.rs`) wires these together into an `HttpServer`;"]
#![doc = "integration tests build the same app around in-memory stores."]

pub mod auth;
pub mod config;
pub mod error;
pub mod mail;
pub mod models;
pub mod routes;
pub mod security;
pub mod state;
pub mod store;

pub use crate::error::AppError;
pub use crate::state::{AppState, Settings};

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod database;
pub mod domain;
pub mod events;
pub mod infrastructure;
pub mod models;
pub mod services;

pub use config::*;
pub use domain::errors::*;
pub use models::*;

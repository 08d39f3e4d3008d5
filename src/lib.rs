pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod membership;
pub mod middleware;
pub mod models;
pub mod services;

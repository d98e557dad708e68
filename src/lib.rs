pub mod auth;
pub mod config;
pub mod error;
pub mod live_reload;
pub mod middleware;
pub mod models;
pub mod render;
pub mod routes;
pub mod server;
pub mod storage;
pub mod tls;

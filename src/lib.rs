pub mod config;
pub mod error;
pub mod gateway;
pub mod middleware;
pub mod models;
pub mod pipeline;
pub mod routes;
pub mod state;

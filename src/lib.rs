pub mod classifier;
pub mod config;
pub mod constants;
pub mod dataset;
pub mod extractors;
pub mod inference;
pub mod logging;
pub mod middleware;
pub mod records;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod vision;

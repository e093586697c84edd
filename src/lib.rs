pub mod api;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod filters;
pub mod schema;
pub mod tables;

pub const BASE_URL: &str = "http://localhost:37240";

pub mod admin;
pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod models;
pub mod pagination;
pub mod routes;
pub mod state;
pub mod storage;
pub mod templates;
pub mod views;

pub mod app;
pub mod auth;
pub mod backend;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod filters;
pub mod handlers;
pub mod paths;
pub mod services;
pub mod session;
pub mod state;
pub mod validation;

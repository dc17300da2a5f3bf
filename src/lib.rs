//! src/lib.rs

pub mod authentication;
pub mod configurations;
pub mod dispatch;
pub mod domain;
pub mod email_client;
pub mod email_log;
pub mod routes;
pub mod startup;
pub mod telemetry;
pub mod templates;
pub mod turnstile;
pub mod utils;

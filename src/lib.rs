pub mod aggregate;
pub mod app;
pub mod config;
pub mod controller;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod output;
pub mod preferences;
pub mod protein;
pub mod query;
pub mod tabular;
pub mod tui;

// orderflow_server/src/lib.rs

pub mod app;
pub mod config;
pub mod db;
pub mod errors;
pub mod listener;
pub mod state;
pub mod web;

pub mod actions;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod polls;
pub mod reconcile;
pub mod service;
pub mod sse;
pub mod startup;
pub mod validation;
pub mod views;

//! Core domain types and logic.

pub mod price;
pub mod universe;
pub mod returns;
pub mod risk;
pub mod weights;
pub mod strategy;
pub mod engine_config;
pub mod metrics;
pub mod goal;
pub mod comparison;
pub mod config_validation;
pub mod error;

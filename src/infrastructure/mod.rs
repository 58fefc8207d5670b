//! Infrastructure layer - Provider clients, logging and services

pub mod llm;
pub mod logging;
pub mod services;

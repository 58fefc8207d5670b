//! Infrastructure services

mod jelly_donut_service;

pub use jelly_donut_service::{JellyDonutResponse, JellyDonutService};

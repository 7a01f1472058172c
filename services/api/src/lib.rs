//! services/api/src/lib.rs
//!
//! The `api` service: adapters for the core ports plus the axum web surface.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;

//! Noteva Migrate - move a blog corpus between a portable bundle and the
//! Noteva content services.
//!
//! This library provides the migration pipelines; `noteva-migrate` is the
//! command line front end.

pub mod config;
pub mod gateway;
pub mod models;
pub mod services;

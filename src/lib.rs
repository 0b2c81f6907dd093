//! Loan Approval Prediction Library
//!
//! This library provides the core functionality for the loan approval service:
//! resolving the trained classifier artifact, encoding application forms into
//! the classifier's feature vector, scoring them, and recording each
//! submission.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core business logic.
//! - `data`: Data access layer.
//! - `circuit_breaker`: Circuit breaker for record store writes.
//! - `classifier`: Classifier trait and the JSON artifact models.
//! - `config`: Configuration management.
//! - `db`: Database connection and pool management.
//! - `encoding`: Feature vector schema and categorical code tables.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `loader`: Model artifact resolution and the shared classifier cell.
//! - `models`: Request, verdict and stored record models.
//! - `routes`: HTTP router assembly.
//! - `service`: The submit pipeline (encode, predict, record).
//! - `sink`: Record sinks (PostgreSQL, in-memory).

pub mod api;
pub mod core;
pub mod data;

pub mod circuit_breaker;
pub mod classifier;
pub mod config;
pub mod db;
pub mod encoding;
pub mod errors;
pub mod handlers;
pub mod loader;
pub mod models;
pub mod routes;
pub mod service;
pub mod sink;

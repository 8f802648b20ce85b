//! Property-Ownership Lookup API Library
//!
//! Core functionality for the property-ownership lookup service: a
//! multi-path entity-resolution search over a local land-registry dataset,
//! a fuzzy suggestion engine, and an external officer/company registry
//! client, plus payment-gated entitlements and result export.
//!
//! # Modules
//!
//! - `config`: Configuration management.
//! - `db`: Database connection and pool management.
//! - `errors`: Error handling types.
//! - `export`: CSV/JSON rendering of result sets.
//! - `fuzzy`: Fuzzy suggestion engine (composite weighted ratio).
//! - `handlers`: HTTP request handlers.
//! - `models`: Core data models.
//! - `normalize`: Canonical comparison keys.
//! - `officers`: External officer/company registry client.
//! - `payments`: Payment ledger and entitlement gate.
//! - `registry`: Local registry store (properties/proprietors).
//! - `search`: Resolution orchestrator.

pub mod config;
pub mod db;
pub mod errors;
pub mod export;
pub mod fuzzy;
pub mod handlers;
pub mod models;
pub mod normalize;
pub mod officers;
pub mod payments;
pub mod registry;
pub mod search;

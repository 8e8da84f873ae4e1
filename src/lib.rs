//! Professional Registry Library
//!
//! Record management for professionals and the contacts they own, exposed over
//! HTTP. The services validate each request, resolve cross-record references and
//! write a professional together with its contacts inside one unit of work.
//!
//! # Modules
//!
//! - `api`: Route table and OpenAPI document.
//! - `config`: Configuration management.
//! - `contact_service`: Contact validation and persistence.
//! - `db`: Database connection and pool management.
//! - `db_storage`: Postgres persistence gateway.
//! - `errors`: Error handling types.
//! - `gateway`: Persistence gateway traits.
//! - `handlers`: HTTP request handlers.
//! - `memory_store`: In-memory persistence gateway.
//! - `models`: Domain, request and response models.
//! - `professional_service`: Professional and contact-list reconciliation.
//! - `validation`: Shared request preconditions.

pub mod api;
pub mod config;
pub mod contact_service;
pub mod db;
pub mod db_storage;
pub mod errors;
pub mod gateway;
pub mod handlers;
pub mod memory_store;
pub mod models;
pub mod professional_service;
pub mod validation;

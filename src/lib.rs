//! Querydeck - a small service that queues read-only SQL, runs it sync or
//! in the background, and caches results.
//!
//! This library exposes the core modules for use in integration tests.

pub mod config;
pub mod db;
pub mod error;
pub mod orchestrator;
pub mod service;
pub mod validator;
pub mod web;

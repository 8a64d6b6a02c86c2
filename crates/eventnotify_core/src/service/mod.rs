//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate directory, link store and transport calls into use-case APIs.
//! - Keep UI layers decoupled from storage details.

pub mod notify_service;

//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls and analytics into use-case level APIs.
//! - Keep tool/CLI layers decoupled from storage details.

pub mod tracker_service;

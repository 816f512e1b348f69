//! # flowctl
//!
//! Command-line client for the flow and tunnel management service.
//!
//! One subcommand per service request, a `send` subcommand for JSON
//! request documents, and `listen` for frames pushed by a publisher.

pub mod commands;
pub mod config;

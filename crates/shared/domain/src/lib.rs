//! # Domain Models
//!
//! This crate contains pure domain types with a single dependency (`serde`).
//! Keep it lean: no I/O, no async, no locking; just data and simple helpers.

pub mod config;
pub mod metadata;

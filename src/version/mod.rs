//! Version discovery layer for the update pipeline
//!
//! This module provides everything needed to find out whether a newer
//! release exists: parsing and ordering versions, talking to remote
//! endpoints and picking the best candidate across sources.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Sources   │────▶│   Handler   │◀────│ Comparator  │
//! │(github,json)│     │  (select)   │     │(channel cmp)│
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │   Client    │
//! │   (HTTP)    │
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`client`]: HTTP client trait and reqwest implementation
//! - [`comparator`]: Channel and scope aware candidate filtering
//! - [`error`]: Error types for update and configuration operations
//! - [`handler`]: Multi-source search returning the best candidate
//! - [`semver`]: Version parsing and ordering
//! - [`sources`]: Concrete release sources (GitHub releases, JSON manifest)

pub mod client;
pub mod comparator;
pub mod error;
pub mod handler;
pub mod semver;
pub mod sources;

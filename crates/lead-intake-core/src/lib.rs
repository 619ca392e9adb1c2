//! # Lead Intake Core
//!
//! Shared logic for Lead Intake: canonical data models, webhook
//! normalization, duplicate resolution, lead scoring, transcript intent
//! classification, audited interaction tracking, and report assembly.
//!
//! This crate contains no tokio, sqlx, or filesystem I/O. Persistence goes
//! through the [`store::LeadStore`] trait; the SQLite implementation lives in
//! the `lead-intake` app crate and [`store::memory::MemoryStore`] is provided
//! here for tests and embedding.
//!
//! ## Pipeline
//!
//! ```text
//! raw event ──▶ canonical ──▶ dedup ──▶ scoring ──┐
//!                                   classifier ───┴──▶ tracker ──▶ LeadStore
//! ```

pub mod canonical;
pub mod classifier;
pub mod clock;
pub mod dedup;
pub mod error;
pub mod models;
pub mod report;
pub mod scoring;
pub mod store;
pub mod tracker;

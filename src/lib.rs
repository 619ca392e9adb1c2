//! # Lead Intake
//!
//! A local-first lead intake pipeline. Webhooks from call-tracking and
//! form-automation systems are normalized into one canonical shape, matched
//! against existing contacts, scored, optionally classified from their call
//! transcript, and recorded with an append-only score audit trail.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────────────┐   ┌──────────┐
//! │  Webhooks    │──▶│  Pipeline                │──▶│  SQLite  │
//! │ CallRail/AC  │   │ normalize·dedup·score·   │   │ leads +  │
//! └──────────────┘   │ classify·track           │   │ audit    │
//!                    └────────────┬─────────────┘   └──────────┘
//!                                 │
//!              ┌──────────────────┼──────────────────┐
//!              ▼                  ▼                  ▼
//!         ┌─────────┐      ┌────────────┐      ┌──────────┐
//!         │   CLI   │      │ stdio RPC  │      │   HTTP   │
//!         │ (leadq) │      │            │      │          │
//!         └─────────┘      └────────────┘      └──────────┘
//! ```
//!
//! The domain logic lives in the `lead-intake-core` crate; this crate adds
//! configuration, SQLite storage, and the transports.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite [`LeadStore`](lead_intake_core::store::LeadStore) |
//! | [`pipeline`] | End-to-end webhook intake |
//! | [`operations`] | The closed operation set shared by all surfaces |
//! | [`rpc`] | Line-delimited JSON-RPC over stdio |
//! | [`server`] | HTTP API |
//! | [`commands`] | CLI command runners |

pub mod commands;
pub mod config;
pub mod db;
pub mod migrate;
pub mod operations;
pub mod pipeline;
pub mod rpc;
pub mod server;
pub mod sqlite_store;

//! `editor-agent` — native Rust driver for the target editor application.
//!
//! This crate implements `hookswitch-core`'s `TargetBackend` facade against
//! a real install of the target: process control through the platform's
//! tasklist/taskkill and pgrep/pkill tooling, entry-script discovery across
//! install conventions, marker-based patch injection, telemetry-id rewrites
//! in `storage.json`, account swaps in the `state.vscdb` SQLite database,
//! and the vendor usage API.
//!
//! # Architecture
//!
//! ```text
//! TargetConfig
//!     │
//!     ▼
//! EditorAgent      ← implements TargetBackend
//!     │
//!     ├── process   tasklist/taskkill · pgrep/pkill · launch
//!     ├── paths     data dir · storage.json · state.vscdb · entry script
//!     ├── patch     marker block inject/strip · .bak fallback
//!     ├── identity  telemetry id generation + storage.json rewrite
//!     ├── account   ItemTable auth rows (rusqlite)
//!     ├── usage     GET /api/usage (reqwest)
//!     └── history   ~/.hookswitch/history.jsonl
//! ```

pub mod account;
pub mod agent;
pub mod history;
pub mod identity;
pub mod patch;
pub mod paths;
pub mod process;
pub mod usage;

pub use agent::EditorAgent;
pub use identity::TelemetryIds;

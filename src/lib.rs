//! rpgtop - PostgreSQL activity monitoring toolkit.
//!
//! This library backs three command line tools:
//! - `rpgtop` - interactive per-table activity monitor
//! - `rpgstat` - streaming cluster counters, vmstat-style
//! - `rpginfo` - one-shot storage and access-pattern report

pub mod catalog;
pub mod collector;
pub mod engine;
pub mod fmt;
pub mod logging;
pub mod report;
pub mod tui;
pub mod view;

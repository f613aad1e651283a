//! # Royale Leaderboard
//!
//! Proxies the Clash Royale API and serves the current season's top
//! players from a time-based cache.
//!
//! ## Architecture
//!
//! - **upstream**: Authenticated access to the Clash Royale API
//! - **models**: Upstream payloads and the served leaderboard entry
//! - **leaderboard**: The season → rankings → players fetch chain
//! - **cache**: Snapshot cache with staleness-driven refresh
//! - **api**: REST API endpoints
//! - **config**: Configuration loading and validation

pub mod api;
pub mod cache;
pub mod config;
pub mod leaderboard;
pub mod models;
pub mod upstream;

pub use models::*;

//! Data models for upstream payloads and the served leaderboard.

mod player;
mod ranking;
mod season;
mod tag;

pub use player::*;
pub use ranking::*;
pub use season::*;
pub use tag::*;

//! HTTP handlers.

pub mod generate;
pub mod health;

pub use health::{health, ready};

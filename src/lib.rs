//! Result-release gating and score aggregation for a school results system.
//!
//! The pure core lives in [`release`] and [`grading`]; [`db`] and [`report`]
//! sit on top of it for the command-line tool.

pub mod access;
pub mod api;
pub mod config;
pub mod db;
pub mod grading;
pub mod models;
pub mod release;
pub mod report;
pub mod session_store;
pub mod standings;

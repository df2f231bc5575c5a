//! Change Simulation core: round-based decision and scoring engine for a
//! classroom change-management role play.

pub mod access;
pub mod command;
pub mod config;
pub mod dashboard;
pub mod engine;
pub mod error;
pub mod event;
pub mod phase;
pub mod render;
pub mod rng;
pub mod scoring;
pub mod snapshot;
pub mod state;
pub mod store;
pub mod types;

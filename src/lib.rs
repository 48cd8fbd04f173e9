//! ITAgent: hardware inventory collection and Snipe-IT reconciliation.
//!
//! `main.rs` loads settings, builds the PowerShell probe and the Snipe-IT
//! client, and hands both to [`agent::run`].

pub mod agent;
pub mod error;
pub mod naming;
pub mod normalize;
pub mod notification;
pub mod probe;
pub mod reconcile;
pub mod snipeit;
pub mod state;
pub mod types;

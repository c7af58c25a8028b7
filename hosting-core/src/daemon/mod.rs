//! Provisioning daemon dispatch
//!
//! The relational store is the work queue; the daemon is only told that pending
//! rows exist. A failed dispatch never undoes committed changes.

mod client;
mod protocol;

pub use client::DaemonClient;
pub use protocol::{exchange, DispatchError, Reply, Stage, OK_CODE};

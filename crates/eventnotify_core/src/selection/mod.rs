//! Selection-reconciliation engine.
//!
//! # Responsibility
//! - Track which contacts a user wants notified for one event.
//! - Reconcile that choice with the link store.
//! - Gate dispatch on durably saved selections only.
//!
//! # Invariants
//! - No process-wide "current event": each `EventView` owns its state.

pub mod reconciler;
pub mod send_gate;
pub mod state;
pub mod view;

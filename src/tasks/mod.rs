//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Change-log prune: Drops change events that aged out of the relevance window

mod prune;

pub use prune::spawn_prune_task;

//! Filesystem utilities for agency.
//!
//! The task store and the dispatcher pid record are both rewritten whole;
//! these helpers make each rewrite all-or-nothing for readers.

pub mod atomic;

pub use atomic::{atomic_write, atomic_write_file};

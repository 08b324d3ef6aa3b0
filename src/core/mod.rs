// LogKeeper - core/mod.rs
//
// Core business logic layer: enumeration, content matching, line counting,
// selection windows, archiving and retention.
// Must NOT depend on: app or CLI code.

pub mod archive;
pub mod content;
pub mod export;
pub mod filter;
pub mod frequency;
pub mod locate;
pub mod model;
pub mod retention;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// True when a cancel flag is present and set.
pub(crate) fn cancel_requested(flag: Option<&Arc<AtomicBool>>) -> bool {
    flag.is_some_and(|f| f.load(Ordering::SeqCst))
}

// LogKeeper - lib.rs
//
// Library entry point. The CLI in `main.rs` is a thin caller over
// `app::engine::LogAnalysisEngine`; any other front end can use it the
// same way.

pub mod app;
pub mod core;
pub mod platform;
pub mod util;

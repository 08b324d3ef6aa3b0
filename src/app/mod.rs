// LogKeeper - app/mod.rs
//
// Application layer: the engine facade and the async upload pipeline.
// Dependencies: core layer.

pub mod engine;
pub mod upload;

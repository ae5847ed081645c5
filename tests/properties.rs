//! Property tests for packlet.
//!
//! Randomized inputs guard the invariants the build relies on: the scanner
//! never panics on source text, and external classification is a pure
//! function of the specifier.
//!
//! Run with: `cargo test --test properties`

#[path = "properties/lexer.rs"]
mod lexer;

#[path = "properties/classification.rs"]
mod classification;

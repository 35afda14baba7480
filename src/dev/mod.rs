// src/dev/mod.rs
//
// Development support: small hand-built tables and random input for tests, demos,
// and fuzzing.
pub mod calc;
pub mod generator;
pub mod literal;

// src/lib.rs
pub mod codec;
pub mod dev;
pub mod error;
pub mod parser;
pub mod preprocess;
pub mod scanner;
pub mod token;

#![forbid(unsafe_code)]

/// Engine v1. Any change to the step semantics or hash layout bumps this.
pub const ENGINE_VERSION: u32 = 1;

pub mod arithmetic;
pub mod error;
pub mod grid;
pub mod kernel;
pub mod activation;
pub mod convolution;
pub mod history;
pub mod invariants;
pub mod hashing;
pub mod engine;

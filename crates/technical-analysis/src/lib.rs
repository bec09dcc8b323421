pub mod indicators;
pub mod analyzer;

#[cfg(test)]
mod indicators_tests;

pub use indicators::*;
pub use analyzer::*;

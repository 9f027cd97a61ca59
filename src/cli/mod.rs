//! Command-line interface

pub mod args;
pub mod runner;

pub use args::Args;
pub use runner::run;

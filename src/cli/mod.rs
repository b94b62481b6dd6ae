//! CLI module for Roundtable
//!
//! Handles command-line argument parsing.

pub mod args;

pub use args::{Args, Verbosity, DEFAULT_PROBLEM};

//! Vatio - Energy attribution and cross-run comparison for containerized benchmarks
//!
//! This library turns already-captured power samples, fork traces and phase
//! timesheets into per-process energy series, summarises each run, and
//! compares runs and container images with paired statistical tests.

pub mod aggregate;
pub mod attribution;
pub mod cli;
pub mod comparison;
pub mod config;
pub mod csv_output;
pub mod json_output;
pub mod pipeline;
pub mod power;
pub mod preflight;
pub mod process_tree;
pub mod series;
pub mod window;

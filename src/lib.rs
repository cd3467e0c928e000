//! `smard-series` library crate.
//!
//! The binary (`smard`) is a thin wrapper around this library so that:
//!
//! - retrieval and assembly are testable against a fake transport
//! - aligned tables can be built without going through the CLI
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod report;
pub mod series;

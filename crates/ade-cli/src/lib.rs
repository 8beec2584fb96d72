//! Command-line front end for the ADE normalization engine.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod summary;

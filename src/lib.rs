// Library crate exposing modules for integration tests

pub mod cli;
pub mod config;
pub mod engine;
pub mod fault;
pub mod logging;
pub mod model;
pub mod repository;
pub mod source;
pub mod util;

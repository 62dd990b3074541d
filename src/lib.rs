pub mod chain;
pub mod cli;
pub mod commands;
pub mod config;
pub mod contracts;
pub mod wallet;

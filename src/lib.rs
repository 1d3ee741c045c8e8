pub mod backend;
pub mod cli;
pub mod cli_handlers;
pub mod client;
pub mod config;
pub mod confirm;
pub mod error;
pub mod layout;
pub mod leveling;
pub mod logging;
pub mod memory;
pub mod models;
pub mod ranking;
pub mod relationships;
pub mod search;
pub mod server;
pub mod session;
pub mod status;
pub mod store;
pub mod transitions;

#[cfg(test)]
pub mod test_utils;

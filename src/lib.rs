pub mod command_handler;
pub mod commands;
pub mod config;
pub mod events;

pub mod ordering;
pub mod identity;
pub mod security;
pub mod storage;
pub mod server;
pub mod config;
pub mod error;
pub mod cli;

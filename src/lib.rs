pub mod auth;
pub mod backend;
pub mod config;
pub mod dbus;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod repomd;
pub mod storage;

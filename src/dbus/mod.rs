//! D-Bus service and client

pub mod client;
pub mod protocol;
pub mod server;

pub use client::{BusClient, DnfDbusClient, DnfPkg, DnfRepo, GroupInfo, RemoteDaemon};
pub use server::{run_until_shutdown, serve, BusError, DnfDbusDaemon, DnfDbusInterface};

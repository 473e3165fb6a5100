#![allow(clippy::uninlined_format_args)]

pub mod client;
pub mod config;
pub mod data;
pub mod feed;
pub mod session;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use client::{Client, Error, Result};

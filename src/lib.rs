//! apiprobe: an API testing client.
//!
//! A [`session::Session`] holds the request form, the last response and the
//! synced history and collection lists. A [`runtime::Runtime`] executes the
//! effects the session asks for, either calling the target directly or going
//! through the [`forwarder`] endpoint.

pub mod cli;
pub mod clipboard;
pub mod collections;
pub mod config;
pub mod error;
pub mod forwarder;
pub mod history;
pub mod http;
pub mod runtime;
pub mod session;
pub mod storage;
pub mod ui;

pub use error::{Error, Result};

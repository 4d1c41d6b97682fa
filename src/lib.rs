//! Reelsync - Library metadata synchronization for remote media servers
//!
//! This library crate exposes the metadata-fetch pipeline and the metadata
//! cache used by the host application during library sync and browsing.

pub mod cache;
pub mod config;
pub mod sync;
pub mod transport;

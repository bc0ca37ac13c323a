//! Library crate for usradmin.
//!
//! This crate exposes the building blocks of the admin TUI:
//! - Admin API client and data model (`api`)
//! - Application state, keymap, background jobs and update loop (`app`)
//! - Cancellable debounce timer (`debounce`)
//! - Error and result types (`error`)
//! - Logs and statistics CSV export (`export`)
//! - Client-side user filtering (`filter`)
//! - UI rendering and widgets (`ui`)
//!
//! It is used by the `usradmin` binary and by tests.
#![doc = include_str!("../README.md")]
#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod api;
pub mod app;
pub mod debounce;
pub mod error;
pub mod export;
pub mod filter;
pub mod ui;

// Re-export commonly used items at the crate root for convenience
/// Convenient error and result types shared across the crate.
pub use error::{DynError, Result};

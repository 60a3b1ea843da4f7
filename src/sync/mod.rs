//! Keeps the visible list consistent with the server, live pushes and
//! unconfirmed local edits.

mod controller;
mod error;
mod notice;

pub use controller::SyncController;

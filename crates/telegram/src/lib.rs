//! Telegram Bot API transport.
//!
//! Implements the [`herald_common::messenger::Messenger`] capability over
//! HTTP, classifying Bot API failures into the variants the broadcast core
//! pattern-matches on.

pub mod client;
pub mod types;

pub use client::TelegramClient;

//! The broadcast core.
//!
//! A trigger (the `/spam` command, or a flagged new member) flows through:
//! 1. [`resolver::RecipientResolver`] merges live group admins with
//!    persisted subscribers into a deduplicated recipient set
//! 2. [`delivery`] sends to one recipient, with bounded rate-limit retry
//!    and unsubscribe-on-permanent-failure
//! 3. [`broadcaster::Broadcaster`] drives the whole fan-out and reports
//!    whether anything got through

pub mod broadcaster;
pub mod delivery;
pub mod resolver;
pub mod subscription;

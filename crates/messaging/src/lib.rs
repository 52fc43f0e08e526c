// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! In-process pub/sub messaging between session plugins.
//!
//! A [`MessageSender`] exists per session scope and dispatches a
//! message synchronously to every locally subscribed plugin, closing
//! each send with explicit `ComponentEnd` and `GlobalEnd` marker
//! receptions so stream consumers know when to hang up.
//! [`MessageManager`] is the public entry point: it pairs a producer
//! (driving the sender) with a consumer (merging reception batches and
//! invoking the caller's handler) over a shared queue.

mod manager;
mod sender;
mod types;

pub use manager::{MessageManager, MessagingError};
pub use sender::{MessageSender, SubscriberGroup};
pub use types::{
    MessageDestination, MessageId, MessageReception, MessageReceptions, MessageSend,
    MessageSubscriber,
};

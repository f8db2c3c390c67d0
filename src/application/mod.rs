//! Application layer containing the dialogue orchestration.
//!
//! This module defines the `ConversationEngine`, which turns inbound gateway
//! events into prompts and ledger commits, and the `SessionStore` that keeps each
//! operator's in-progress dialogue behind a per-user async mutex.

pub mod engine;
pub mod prompts;
pub mod sessions;

//! Pixie LED controller protocol: topic layout, payload codec, per-channel
//! state and the coordinator tying them together.

pub mod catalog;
pub mod codec;
pub mod coordinator;
pub mod identity;
pub mod state;
pub mod topics;

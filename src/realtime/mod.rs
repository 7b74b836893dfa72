//! Websocket fan-out: presence, typing, message events and call signaling.

pub mod events;
pub mod hub;

pub use events::{ClientEvent, ServerEvent};
pub use hub::{EndedCall, Hub};

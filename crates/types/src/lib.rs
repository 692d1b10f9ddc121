//! Shared payload types for the linksim transport models.
//!
//! Payloads are plain owned values. A channel that accepts a payload takes
//! ownership of it: on loss the value is dropped, on delivery it is moved
//! out through the channel's output port to the next receiver. Nothing in
//! this crate is reference-counted — the lossy-sink contract depends on
//! linear ownership.

mod packet;

pub use packet::{Ack, Packet};

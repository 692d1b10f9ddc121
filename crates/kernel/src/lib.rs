//! Deterministic virtual-time kernel for linksim.
//!
//! This crate provides the discrete-event core the transport models are
//! built on:
//!
//! - [`Simulator`]: virtual clock, priority-ordered event queue, run control
//! - [`Event`] / [`EventHandle`]: deferred callbacks with cancellation
//! - [`Signal`] / [`Trigger`]: output ports with delayed slot dispatch
//!
//! # Architecture
//!
//! ```text
//! component ── Signal::fire(payload, delay) ──▶ event queue
//!                                                  │ pop least (expire_at, id)
//!                                                  ▼
//!                                            slot callback ──▶ may fire / add / cancel
//! ```
//!
//! The kernel is:
//! - **Single-threaded**: one logical thread dequeues events and runs each
//!   callback to completion; there is no preemption and no re-entrancy.
//! - **Deterministic**: time only advances at event boundaries, and
//!   simultaneous events dispatch in construction order of their ids.
//! - **Virtual-time only**: no wall clock anywhere; "waiting" is always
//!   expressed by scheduling a future event.

mod event;
mod queue;
mod signal;

pub use event::{Event, EventHandle, EventId};
pub use queue::{KernelStats, Simulator};
pub use signal::{Signal, Trigger};

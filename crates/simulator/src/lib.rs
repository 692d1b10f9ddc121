//! End-to-end link simulation.
//!
//! Assembles the canonical pipeline on top of the kernel and channel
//! models:
//!
//! ```text
//! Source ──packets──▶ PacketChannel ──delayed──▶ Sink
//!    ▲                    │ ▲                      │
//!    │                    │ └─ poll / pull ◀───────┤ (readiness, bursts)
//!    └──── AckChannel ◀───┴────────────acks────────┘
//! ```
//!
//! [`Pipeline`] owns the wiring; [`Source`] and [`Sink`] are reusable
//! endpoints for custom assemblies. Runs are deterministic: the same
//! [`PipelineConfig`] (seeds included) produces the same
//! [`PipelineReport`].

mod pipeline;
mod sink;
mod source;

pub use pipeline::{Pipeline, PipelineConfig, PipelineReport};
pub use sink::Sink;
pub use source::Source;

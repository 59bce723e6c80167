//! Hand-written protobuf types for the frame log.
//!
//! Uses prost derive macros for encode/decode without prost-build.
//! Field numbers are part of the on-disk format; never renumber.

use prost::Message;

// ── Grid ───────────────────────────────────────────────────────

#[derive(Clone, PartialEq, Message)]
pub struct ProtoGrid {
    #[prost(uint64, tag = "1")]
    pub height: u64,
    #[prost(uint64, tag = "2")]
    pub width: u64,
    /// Row-major cell values.
    #[prost(double, repeated, tag = "3")]
    pub cells: Vec<f64>,
}

// ── Frame ──────────────────────────────────────────────────────

#[derive(Clone, PartialEq, Message)]
pub struct ProtoFrame {
    #[prost(uint64, tag = "1")]
    pub index: u64,
    #[prost(uint32, tag = "2")]
    pub engine_version: u32,
    #[prost(message, optional, tag = "3")]
    pub grid: Option<ProtoGrid>,
}

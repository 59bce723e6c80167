#![forbid(unsafe_code)]

//! Convolution automaton runtime.
//!
//! Wraps the engine with run configuration, video export, an on-disk
//! frame log, run manifests, replay and drift detection.
//!
//! No stepping logic lives here — every transition is delegated to
//! `nca_engine`.

pub mod config;
pub mod error;
pub mod proto_types;
pub mod proto_bridge;
pub mod frame_log;
pub mod y4m;
pub mod exporter;
pub mod manifest;
pub mod replay;
pub mod drift;
pub mod session;

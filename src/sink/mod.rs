//! Frame distribution.
//!
//! Presented frames fan out to passive observers, one-shot captures and attached
//! [`frame_sink::FrameSink`] implementations without ever blocking the render loop.

/// Fan-out of presented frames and frame-done events.
pub(crate) mod distributor;
/// Generic frame sink trait and built-in sinks.
pub(crate) mod frame_sink;

//! Capture pipeline
//!
//! Everything that runs inside the capturing context: acquiring raw media
//! through the context's own capability, composing the deliverable stream,
//! and feeding the encoder. The controller never touches these types
//! directly; it talks to the [`CaptureHost`] through the bridge.

pub mod composer;
pub mod host;
pub mod provider;
pub mod traits;

pub use composer::{ComposedStream, StreamComposer};
pub use host::{CaptureHost, EncoderFactory, StreamEncoder};
pub use provider::CaptureSourceProvider;
pub use traits::{CaptureSource, VideoConstraints};

//! Recorder pipeline: input capture → rate/channel conversion → raw buffer.
//!
//! # Pipeline
//!
//! ```text
//! CaptureSource (48 kHz stereo f32) → ResampleFilter (16 kHz mono i16)
//!           → RingBuffer<u8> raw stage → RecorderHandle::read
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voice_assistant_core::audio::{CpalCapture, RecorderPipeline};
//! use voice_assistant_core::config::RecorderConfig;
//!
//! let source = Arc::new(CpalCapture::new().unwrap());
//! let recorder = RecorderPipeline::new(source, RecorderConfig::default());
//!
//! let mut handle = recorder.open().unwrap();
//! let mut pcm = [0u8; 960];
//! let n = handle.read(&mut pcm).unwrap();
//! println!("read {n} bytes of 16 kHz mono PCM");
//! handle.close();
//! ```

pub mod buffer;
pub mod capture;
pub mod recorder;
pub mod resample;

pub use buffer::RingBuffer;
pub use capture::{AudioChunk, CaptureError, CaptureFormat, CaptureSource, CpalCapture, StreamHandle};
pub use recorder::{PipelineError, RecorderHandle, RecorderPipeline};
pub use resample::{stereo_to_mono, to_pcm16_bytes, ResampleFilter};

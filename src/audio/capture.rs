//! Input-capture stage of the recorder graph.
//!
//! [`CaptureSource`] is the seam between the recorder pipeline and the audio
//! hardware.  [`CpalCapture`] is the host implementation on top of `cpal`.
//! [`CaptureSource::start`] returns a [`StreamHandle`]; dropping it stops the
//! stream and, with it, the chunk sender.

use std::any::Any;
use std::sync::mpsc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

// ---------------------------------------------------------------------------
// AudioChunk / CaptureFormat
// ---------------------------------------------------------------------------

/// One buffer of interleaved `f32` samples in `[-1.0, 1.0]`, in the format
/// the capture stage was started with.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
}

/// Format requested from the capture hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

// ---------------------------------------------------------------------------
// StreamHandle
// ---------------------------------------------------------------------------

/// RAII guard keeping a capture stream alive.
///
/// Wraps whatever object the backend needs to hold (a `cpal::Stream` on the
/// host).  Not `Send`: the stream stays on the thread that opened it.
pub struct StreamHandle {
    _stream: Box<dyn Any>,
}

impl StreamHandle {
    pub fn new<S: 'static>(stream: S) -> Self {
        Self {
            _stream: Box::new(stream),
        }
    }
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("input device does not support {channels} ch @ {sample_rate} Hz")]
    UnsupportedFormat { sample_rate: u32, channels: u16 },

    #[error("failed to query input configs: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("capture source failed: {0}")]
    Source(String),
}

// ---------------------------------------------------------------------------
// CaptureSource
// ---------------------------------------------------------------------------

/// Something that can stream interleaved audio in a requested format.
pub trait CaptureSource: Send + Sync {
    /// Start streaming [`AudioChunk`]s to `tx` until the returned handle is
    /// dropped.
    fn start(
        &self,
        format: CaptureFormat,
        tx: mpsc::Sender<AudioChunk>,
    ) -> Result<StreamHandle, CaptureError>;
}

// ---------------------------------------------------------------------------
// CpalCapture
// ---------------------------------------------------------------------------

/// Microphone capture on the default `cpal` input device.
pub struct CpalCapture {
    device: cpal::Device,
}

impl CpalCapture {
    /// # Errors
    ///
    /// Returns [`CaptureError::NoDevice`] when no input device is available.
    pub fn new() -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;
        Ok(Self { device })
    }

    fn supports(&self, format: CaptureFormat) -> Result<bool, CaptureError> {
        let rate = cpal::SampleRate(format.sample_rate);
        Ok(self.device.supported_input_configs()?.any(|range| {
            range.channels() == format.channels
                && range.min_sample_rate() <= rate
                && rate <= range.max_sample_rate()
        }))
    }
}

impl CaptureSource for CpalCapture {
    fn start(
        &self,
        format: CaptureFormat,
        tx: mpsc::Sender<AudioChunk>,
    ) -> Result<StreamHandle, CaptureError> {
        if !self.supports(format)? {
            return Err(CaptureError::UnsupportedFormat {
                sample_rate: format.sample_rate,
                channels: format.channels,
            });
        }

        let config = cpal::StreamConfig {
            channels: format.channels,
            sample_rate: cpal::SampleRate(format.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let stream = self.device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                // Receiver gone means the recorder closed; drop the chunk.
                let _ = tx.send(AudioChunk {
                    samples: data.to_vec(),
                });
            },
            |err: cpal::StreamError| {
                log::error!("cpal stream error: {err}");
            },
            None,
        )?;

        stream.play()?;
        Ok(StreamHandle::new(stream))
    }
}

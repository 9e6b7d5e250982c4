//! Sample-rate and channel conversion stage.
//!
//! The capture graph turns 48 kHz stereo codec input into the 16 kHz mono
//! 16-bit PCM the recognition engine expects:
//!
//! 1. [`stereo_to_mono`]: downmix interleaved channels by averaging.
//! 2. A streaming `rubato` FFT resampler, fed in fixed-size chunks.
//! 3. [`to_pcm16_bytes`]: clamp, quantise and serialise little-endian.
//!
//! [`ResampleFilter`] bundles the three steps for one open capture graph.
//! It keeps the resampler state and any leftover input between chunks, so
//! the output rate holds regardless of how the capture stage slices audio.

use rubato::{FftFixedIn, ResampleError, Resampler, ResamplerConstructionError};

use crate::config::RecorderConfig;

/// Mix interleaved multi-channel audio down to mono by averaging all channels.
///
/// * `channels == 1` returns the input unchanged.
/// * `channels == 0` returns an empty vector.
///
/// ```rust
/// use voice_assistant_core::audio::stereo_to_mono;
///
/// let stereo = vec![0.5_f32, -0.5, 0.2, 0.4]; // L R L R
/// let mono = stereo_to_mono(&stereo, 2);
/// assert_eq!(mono.len(), 2);
/// assert!((mono[0] - 0.0).abs() < 1e-6);
/// assert!((mono[1] - 0.3).abs() < 1e-6);
/// ```
pub fn stereo_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

/// Quantise `[-1.0, 1.0]` samples to little-endian signed 16-bit PCM bytes.
/// Out-of-range samples are clamped.
pub fn to_pcm16_bytes(samples: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// Stateful conversion from the capture format to the engine format.
///
/// One filter lives for one open graph and is owned by its worker thread.
pub struct ResampleFilter {
    source_channels: u16,
    output_channels: u16,
    /// `None` when the source already runs at the output rate.
    resampler: Option<FftFixedIn<f32>>,
    /// Mono input waiting for a full resampler chunk.
    pending: Vec<f32>,
}

impl ResampleFilter {
    /// Build a filter for `config`, resampling in 10 ms input chunks.
    ///
    /// # Errors
    ///
    /// Fails when `rubato` rejects the rate pair.
    pub fn new(config: &RecorderConfig) -> Result<Self, ResamplerConstructionError> {
        let resampler = if config.source_rate == config.output_rate {
            None
        } else {
            let chunk = (config.source_rate as usize / 100).max(1);
            Some(FftFixedIn::<f32>::new(
                config.source_rate as usize,
                config.output_rate as usize,
                chunk,
                1,
                1,
            )?)
        };
        Ok(Self {
            source_channels: config.source_channels,
            output_channels: config.output_channels,
            resampler,
            pending: Vec::new(),
        })
    }

    /// Convert one interleaved capture chunk into engine-ready PCM bytes.
    ///
    /// Input that does not fill a resampler chunk is kept for the next call,
    /// so the returned buffer may be empty.
    pub fn process(&mut self, interleaved: &[f32]) -> Result<Vec<u8>, ResampleError> {
        let mono = stereo_to_mono(interleaved, self.source_channels);
        let converted = match self.resampler.as_mut() {
            None => mono,
            Some(resampler) => {
                self.pending.extend_from_slice(&mono);
                let mut out = Vec::new();
                loop {
                    let needed = resampler.input_frames_next();
                    if self.pending.len() < needed {
                        break;
                    }
                    let frames = resampler.process(&[&self.pending[..needed]], None)?;
                    if let Some(channel) = frames.first() {
                        out.extend_from_slice(channel);
                    }
                    self.pending.drain(..needed);
                }
                out
            }
        };
        Ok(self.to_output_bytes(&converted))
    }

    /// Number of mono input samples held back for the next chunk.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn to_output_bytes(&self, mono: &[f32]) -> Vec<u8> {
        if self.output_channels <= 1 {
            return to_pcm16_bytes(mono);
        }
        // Duplicate the mono signal across every output channel.
        let channels = self.output_channels as usize;
        let mut interleaved_out = Vec::with_capacity(mono.len() * channels);
        for &s in mono {
            interleaved_out.extend(std::iter::repeat(s).take(channels));
        }
        to_pcm16_bytes(&interleaved_out)
    }
}

impl std::fmt::Debug for ResampleFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResampleFilter")
            .field("source_channels", &self.source_channels)
            .field("output_channels", &self.output_channels)
            .field("resampling", &self.resampler.is_some())
            .field("pending", &self.pending.len())
            .finish()
    }
}

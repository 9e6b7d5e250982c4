//! Recorder pipeline adapter consumed by the recognition engine.
//!
//! ```text
//! CaptureSource (48 kHz stereo) ─▶ ResampleFilter ─▶ raw stage (RingBuffer<u8>)
//!      cpal thread                 "recorder-filter"      RecorderHandle::read
//! ```
//!
//! [`RecorderPipeline::open`] builds and starts the graph and hands back a
//! [`RecorderHandle`].  The handle is the only way to read, and dropping it
//! (or calling [`RecorderHandle::close`]) tears the graph down exactly once.
//! At most one handle per pipeline is outstanding.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Condvar, Mutex, PoisonError};
use std::thread::JoinHandle;

use rubato::ResamplerConstructionError;
use thiserror::Error;

use super::buffer::RingBuffer;
use super::capture::{AudioChunk, CaptureError, CaptureFormat, CaptureSource, StreamHandle};
use super::resample::ResampleFilter;
use crate::config::RecorderConfig;

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A handle from a previous `open` has not been closed yet.
    #[error("recorder pipeline is already open")]
    AlreadyOpen,

    #[error("capture stage failed: {0}")]
    Capture(#[from] CaptureError),

    #[error("cannot build the resample stage: {0}")]
    Resampler(#[from] ResamplerConstructionError),

    #[error("failed to spawn recorder worker: {0}")]
    Worker(String),

    /// The capture stage stopped and every buffered byte has been read.
    #[error("recorder pipeline closed")]
    Closed,
}

// ---------------------------------------------------------------------------
// Raw stage
// ---------------------------------------------------------------------------

struct RawState {
    buf: RingBuffer<u8>,
    closed: bool,
}

/// Blocking byte queue between the conversion worker and the reader.
struct RawStage {
    state: Mutex<RawState>,
    ready: Condvar,
}

impl RawStage {
    /// `capacity` is rounded down to whole 16-bit frames of `channels`
    /// samples, with room for at least one frame.  Overwrites then always
    /// drop whole frames and never split a sample.
    fn new(capacity: usize, channels: u16) -> Self {
        let frame = 2 * usize::from(channels.max(1));
        let capacity = (capacity / frame).max(1) * frame;
        Self {
            state: Mutex::new(RawState {
                buf: RingBuffer::new(capacity),
                closed: false,
            }),
            ready: Condvar::new(),
        }
    }

    fn push(&self, bytes: &[u8]) {
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let dropped = st.buf.push_slice(bytes);
        if dropped > 0 {
            log::debug!(
                "recorder: reader behind, overwrote {dropped} bytes ({} buffered)",
                st.buf.len()
            );
        }
        self.ready.notify_all();
    }

    fn close(&self) {
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        st.closed = true;
        self.ready.notify_all();
    }

    fn read(&self, out: &mut [u8]) -> Result<usize, PipelineError> {
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        while st.buf.is_empty() && !st.closed {
            st = self.ready.wait(st).unwrap_or_else(PoisonError::into_inner);
        }
        if st.buf.is_empty() {
            return Err(PipelineError::Closed);
        }
        Ok(st.buf.read_into(out))
    }
}

// ---------------------------------------------------------------------------
// RecorderPipeline
// ---------------------------------------------------------------------------

/// Clears the pipeline's open flag when dropped, on success and error paths.
struct OpenGuard(Arc<AtomicBool>);

impl Drop for OpenGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Builds capture graphs on demand for the recognition engine.
pub struct RecorderPipeline {
    source: Arc<dyn CaptureSource>,
    config: RecorderConfig,
    open: Arc<AtomicBool>,
}

impl RecorderPipeline {
    pub fn new(source: Arc<dyn CaptureSource>, config: RecorderConfig) -> Self {
        Self {
            source,
            config,
            open: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Returns `true` while a [`RecorderHandle`] is outstanding.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Construct the capture → convert → raw graph and start it.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::AlreadyOpen`] if the previous handle is still alive.
    /// - [`PipelineError::Resampler`], [`PipelineError::Worker`] or
    ///   [`PipelineError::Capture`] if a stage
    ///   cannot be built or started.  Nothing is left running on failure.
    pub fn open(&self) -> Result<RecorderHandle, PipelineError> {
        if self.open.swap(true, Ordering::SeqCst) {
            return Err(PipelineError::AlreadyOpen);
        }
        let guard = OpenGuard(Arc::clone(&self.open));

        let mut filter = ResampleFilter::new(&self.config)?;
        let raw = Arc::new(RawStage::new(
            self.config.raw_buffer_bytes,
            self.config.output_channels,
        ));
        let (tx, rx) = mpsc::channel::<AudioChunk>();

        let worker_raw = Arc::clone(&raw);
        let worker = std::thread::Builder::new()
            .name("recorder-filter".into())
            .spawn(move || {
                while let Ok(chunk) = rx.recv() {
                    match filter.process(&chunk.samples) {
                        Ok(pcm) if pcm.is_empty() => {}
                        Ok(pcm) => worker_raw.push(&pcm),
                        Err(e) => log::warn!("recorder: dropping capture chunk: {e}"),
                    }
                }
                worker_raw.close();
            })
            .map_err(|e| PipelineError::Worker(e.to_string()))?;

        let format = CaptureFormat {
            sample_rate: self.config.source_rate,
            channels: self.config.source_channels,
        };
        let stream = match self.source.start(format, tx) {
            Ok(stream) => stream,
            Err(e) => {
                // The sender went down with the failed start, so the worker
                // is already on its way out.
                let _ = worker.join();
                log::error!("recorder: failed to start capture: {e}");
                return Err(e.into());
            }
        };

        log::info!(
            "recorder: graph running ({} Hz/{} ch → {} Hz/{} ch)",
            self.config.source_rate,
            self.config.source_channels,
            self.config.output_rate,
            self.config.output_channels,
        );

        Ok(RecorderHandle {
            stream: Some(stream),
            raw,
            worker: Some(worker),
            _guard: guard,
        })
    }
}

// ---------------------------------------------------------------------------
// RecorderHandle
// ---------------------------------------------------------------------------

/// Exclusive handle on a running capture graph.
pub struct RecorderHandle {
    stream: Option<StreamHandle>,
    raw: Arc<RawStage>,
    worker: Option<JoinHandle<()>>,
    _guard: OpenGuard,
}

impl RecorderHandle {
    /// Block until converted PCM is available and copy up to `out.len()`
    /// bytes of it into `out`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Closed`] once the capture stage has stopped and the
    /// raw stage is drained.
    pub fn read(&mut self, out: &mut [u8]) -> Result<usize, PipelineError> {
        if out.is_empty() {
            return Ok(0);
        }
        self.raw.read(out)
    }

    /// Tear the graph down.  Equivalent to dropping the handle.
    pub fn close(self) {}
}

impl Drop for RecorderHandle {
    fn drop(&mut self) {
        drop(self.stream.take());
        self.raw.close();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("recorder: filter worker panicked");
            }
        }
        log::info!("recorder: graph closed");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

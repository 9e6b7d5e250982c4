//! Host entry point: runs the device core against console stand-ins.
//!
//! # Startup sequence
//!
//! 1. Load [`DeviceConfig`] from disk (defaults when missing).
//! 2. Initialise logging with the configured filter.
//! 3. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Build the [`Device`] with host collaborators and spawn its mailboxes.
//! 5. Read console commands until EOF or `quit`.
//!
//! # Commands
//!
//! | Command | Event |
//! |---------|-------|
//! | `rec` | record key pressed |
//! | `mode` | mode key released |
//! | `vol-` / `vol+` | volume pads pressed |
//! | `play` | play pad pressed |
//! | `wifi` | provisioning pad pressed |
//! | `net up` / `net down` | network connected / disconnected |
//! | `svc <state>` | service reports `idle`, `connecting`, `connected`, `running` or `stopped` |
//! | `mic` | open the recorder, read one second of audio, close it |
//!
//! A `rec` wake-up makes the console engine open the recorder and report
//! voice activity from the microphone level until the configured
//! voice-activity-off delay or wake-up timeout runs out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc as std_mpsc, Arc, OnceLock};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use voice_assistant_core::{
    app::{Collaborators, Device, DeviceHandle},
    audio::{
        AudioChunk, CaptureError, CaptureFormat, CaptureSource, CpalCapture, RecorderPipeline,
        StreamHandle,
    },
    config::DeviceConfig,
    indicator::LogIndicator,
    peripheral::{ButtonKey, KeyAction, KeyMap, NetworkStatus, RawPeripheralEvent, TouchPad},
    playback::LocalPlayback,
    provisioning::{NetworkLink, ProvisioningError, ProvisioningMode},
    recognition::{EngineSetup, RecognitionEngine, RecognitionEvent},
    service::{ConnectionState, ServiceError, VoiceService},
};

// ---------------------------------------------------------------------------
// Host collaborators
// ---------------------------------------------------------------------------

/// Voice service that logs requests and reports the state a real backend
/// would move to.
#[derive(Default)]
struct ConsoleService {
    states: OnceLock<mpsc::WeakSender<ConnectionState>>,
}

impl ConsoleService {
    fn report(&self, state: ConnectionState) -> Result<(), ServiceError> {
        let tx = self
            .states
            .get()
            .and_then(mpsc::WeakSender::upgrade)
            .ok_or_else(|| ServiceError::Request("service mailbox closed".into()))?;
        tx.try_send(state)
            .map_err(|e| ServiceError::Request(e.to_string()))
    }
}

impl VoiceService for ConsoleService {
    fn connect(&self) -> Result<(), ServiceError> {
        println!("[service] connect");
        self.report(ConnectionState::Connecting)?;
        self.report(ConnectionState::Connected)
    }

    fn start(&self) -> Result<(), ServiceError> {
        println!("[service] start");
        self.report(ConnectionState::Running)
    }

    fn stop(&self) -> Result<(), ServiceError> {
        println!("[service] stop");
        self.report(ConnectionState::Stopped)
    }
}

/// Network link whose provisioning handshake completes after a short delay.
#[derive(Default)]
struct HostLink {
    provisioning: AtomicBool,
}

#[async_trait]
impl NetworkLink for HostLink {
    fn is_provisioning(&self) -> bool {
        self.provisioning.load(Ordering::SeqCst)
    }

    async fn provision(&self, mode: ProvisioningMode) -> Result<(), ProvisioningError> {
        println!("[network] waiting for {mode:?} credentials");
        self.provisioning.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(3)).await;
        self.provisioning.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Opens the default microphone on every capture start, so the device also
/// runs on hosts without one.
struct HostMicrophone;

impl CaptureSource for HostMicrophone {
    fn start(
        &self,
        format: CaptureFormat,
        tx: std_mpsc::Sender<AudioChunk>,
    ) -> Result<StreamHandle, CaptureError> {
        CpalCapture::new()?.start(format, tx)
    }
}

/// Peak level above which a block of PCM counts as speech.
const SPEECH_LEVEL: f32 = 0.02;

/// Recognition engine stand-in: each wake-up opens the recorder on its own
/// thread and gates voice activity on the microphone level.
#[derive(Default)]
struct ConsoleEngine {
    setup: OnceLock<EngineSetup>,
}

impl RecognitionEngine for ConsoleEngine {
    fn setup(&self, setup: EngineSetup) {
        if self.setup.set(setup).is_err() {
            log::warn!("engine: setup delivered twice, keeping the first");
        }
    }

    fn trigger_wakeup(&self) {
        let Some(setup) = self.setup.get().cloned() else {
            log::warn!("engine: wake-up before setup");
            return;
        };
        let spawned = std::thread::Builder::new()
            .name("console-engine".into())
            .spawn(move || wakeup_session(&setup));
        if let Err(e) = spawned {
            log::error!("engine: cannot start wake-up session: {e}");
        }
    }
}

fn peak_level(pcm: &[u8]) -> f32 {
    pcm.chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]).unsigned_abs())
        .max()
        .map_or(0.0, |peak| f32::from(peak) / i16::MAX as f32)
}

/// One wake-up window: open, read until speech ends or the window closes,
/// then close.
fn wakeup_session(setup: &EngineSetup) {
    let recorder = setup.recorder.config();
    let bytes_per_ms =
        (u64::from(recorder.output_rate) * u64::from(recorder.output_channels) * 2 / 1_000).max(1);
    let mut recording = match setup.recorder.open() {
        Ok(recording) => recording,
        Err(e) => {
            log::warn!("engine: {e}");
            return;
        }
    };
    setup.report(RecognitionEvent::WakeupStart);

    // 10 ms blocks
    let mut block = vec![0u8; (bytes_per_ms * 10) as usize];
    let mut heard: u64 = 0;
    let mut last_speech: Option<u64> = None;
    while heard / bytes_per_ms < setup.config.wakeup_timeout_ms {
        let n = match recording.read(&mut block) {
            Ok(n) => n,
            Err(e) => {
                log::warn!("engine: {e}");
                break;
            }
        };
        heard += n as u64;
        if peak_level(&block[..n]) > SPEECH_LEVEL {
            if last_speech.is_none() {
                setup.report(RecognitionEvent::VoiceActivityStart);
            }
            last_speech = Some(heard);
        } else if let Some(at) = last_speech {
            if (heard - at) / bytes_per_ms >= setup.config.vad_off_delay_ms {
                setup.report(RecognitionEvent::VoiceActivityStop);
                break;
            }
        }
    }
    recording.close();
    setup.report(RecognitionEvent::WakeupEnd);
}

// ---------------------------------------------------------------------------
// Console commands
// ---------------------------------------------------------------------------

enum Command {
    Peripheral(RawPeripheralEvent),
    Service(ConnectionState),
    Mic,
    Quit,
}

fn parse_command(line: &str, keys: &KeyMap) -> Option<Command> {
    let mut words = line.split_whitespace();
    let command = match (words.next()?, words.next()) {
        ("rec", None) => Command::Peripheral(RawPeripheralEvent::button(
            keys.button_code(ButtonKey::Record),
            KeyAction::Pressed,
        )),
        ("mode", None) => Command::Peripheral(RawPeripheralEvent::button(
            keys.button_code(ButtonKey::Mode),
            KeyAction::Released,
        )),
        ("vol-", None) => touch(keys, TouchPad::VolumeDown),
        ("vol+", None) => touch(keys, TouchPad::VolumeUp),
        ("play", None) => touch(keys, TouchPad::Play),
        ("wifi", None) => touch(keys, TouchPad::Provisioning),
        ("net", Some("up")) => {
            Command::Peripheral(RawPeripheralEvent::network(NetworkStatus::Connected))
        }
        ("net", Some("down")) => {
            Command::Peripheral(RawPeripheralEvent::network(NetworkStatus::Disconnected))
        }
        ("svc", Some(name)) => Command::Service(ConnectionState::from_name(name)?),
        ("mic", None) => Command::Mic,
        ("quit" | "exit", None) => Command::Quit,
        _ => return None,
    };
    Some(command)
}

fn touch(keys: &KeyMap, pad: TouchPad) -> Command {
    Command::Peripheral(RawPeripheralEvent::touch(
        keys.pad_code(pad),
        KeyAction::Pressed,
    ))
}

/// Open the recorder, read one second of PCM and close it again.
fn record_one_second(recorder: &RecorderPipeline) -> Result<usize> {
    let config = recorder.config();
    let bytes_per_second =
        config.output_rate as usize * usize::from(config.output_channels) * 2;

    let mut handle = recorder.open().context("opening recorder pipeline")?;
    let mut chunk = [0u8; 3_200];
    let mut total = 0;
    while total < bytes_per_second {
        total += handle.read(&mut chunk).context("reading recorder pipeline")?;
    }
    handle.close();
    Ok(total)
}

async fn console_loop(
    handle: &DeviceHandle,
    keys: KeyMap,
    recorder: Arc<RecorderPipeline>,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("commands: rec mode vol- vol+ play wifi | net up|down | svc <state> | mic | quit");

    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_command(line, &keys) {
            Some(Command::Peripheral(event)) => handle
                .peripherals
                .send(event)
                .await
                .context("peripheral mailbox closed")?,
            Some(Command::Service(state)) => handle
                .service
                .send(state)
                .await
                .context("service mailbox closed")?,
            Some(Command::Mic) => {
                let recorder = Arc::clone(&recorder);
                match tokio::task::spawn_blocking(move || record_one_second(&recorder)).await? {
                    Ok(bytes) => println!("[mic] read {bytes} bytes of PCM"),
                    Err(e) => println!("[mic] {e:#}"),
                }
            }
            Some(Command::Quit) => break,
            None => println!("unknown command: {line}"),
        }
        println!(
            "[status] service {} (retry {})",
            handle.session().state(),
            handle.session().retry_counter()
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let loaded = DeviceConfig::load();
    let config = loaded.as_ref().cloned().unwrap_or_default();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_filter.as_str()),
    )
    .init();
    if let Err(e) = &loaded {
        log::warn!("Failed to load config ({e:#}); using defaults");
    }
    log::info!("voice assistant core starting up");

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("creating tokio runtime")?;

    let service = Arc::new(ConsoleService::default());
    let recorder = Arc::new(RecorderPipeline::new(
        Arc::new(HostMicrophone),
        config.recorder.clone(),
    ));
    let parts = Collaborators {
        service: service.clone(),
        link: Arc::new(HostLink::default()),
        engine: Arc::new(ConsoleEngine::default()),
        recorder: Arc::clone(&recorder),
        playback: Arc::new(LocalPlayback::default()),
        indicator: Arc::new(LogIndicator),
    };

    let device = Device::new(&config, parts, rt.handle().clone());
    let keys = device.dispatcher().keymap().clone();
    let handle = device.spawn(rt.handle());
    // Weak sender so shutdown can close the mailbox.  The cell is fresh, so
    // `set` cannot fail.
    let _ = service.states.set(handle.service.downgrade());

    rt.block_on(async {
        let result = console_loop(&handle, keys, recorder).await;
        handle.shutdown().await;
        result
    })
}

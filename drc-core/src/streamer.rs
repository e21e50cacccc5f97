//! The streamer: one handle over video, audio, input, and commands.
//!
//! ```text
//! push_vid_frame ─► VideoConverter ─► VideoEncoder ─► VideoPacketizer ─► VstrmTransport ─► video dest
//! push_aud_samples ─► AudioEncoder ─────────────────────────────────────► UDP ─► audio dest
//! poll_input ◄── InputReceiver ◄── input bind
//! set_lcd_backlight / get_uic_config ─► CommandTransport ─► PendingReply
//! ```
//!
//! All media and command operations take `&self`, so a started streamer
//! can be shared behind an `Arc` and driven from several tasks. Frames
//! are encoded and sent under one lock so each frame's packets leave
//! contiguously.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::runtime::Handle;
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{info, trace, warn};

use crate::command::{CommandTransport, DeviceCommand, PendingReply};
use crate::config::{Endpoints, StreamerConfig};
use crate::error::DrcError;
use crate::input::{InputReceiver, InputSnapshot};
use crate::media::audio::validate_samples;
use crate::media::{AudioEncoder, FlipMode, PixelFormat, VideoConverter, VideoEncoder, VideoPacketizer};
use crate::screen::{NATIVE_FRAME_SIZE, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::task::BackgroundTask;
use crate::transport::{VstrmTransport, unspecified_like};

const MSG_BUFFER_SIZE: usize = 2048;

// ── Internal state ───────────────────────────────────────────────

struct VideoPipeline {
    converter: Option<Box<dyn VideoConverter>>,
    encoder: Option<Box<dyn VideoEncoder>>,
    packetizer: VideoPacketizer,
}

/// Everything that exists only between `start` and `stop`.
struct Session {
    endpoints: Endpoints,
    video: VstrmTransport,
    audio: UdpSocket,
    runtime: Handle,
    messages: BackgroundTask,
}

// ── Streamer ─────────────────────────────────────────────────────

pub struct Streamer {
    config: StreamerConfig,
    input: InputReceiver,
    video: Mutex<VideoPipeline>,
    audio: Mutex<Option<Box<dyn AudioEncoder>>>,
    commands: Option<Arc<dyn CommandTransport>>,
    session: Option<Session>,
}

impl Streamer {
    pub fn new(config: StreamerConfig) -> Self {
        let input = InputReceiver::new(config.input_bind.clone()).with_timeout(config.input_timeout());
        Self {
            config,
            input,
            video: Mutex::new(VideoPipeline {
                converter: None,
                encoder: None,
                packetizer: VideoPacketizer::default(),
            }),
            audio: Mutex::new(None),
            commands: None,
            session: None,
        }
    }

    pub fn with_video_encoder(mut self, encoder: impl VideoEncoder + 'static) -> Self {
        self.video.get_mut().encoder = Some(Box::new(encoder));
        self
    }

    pub fn with_video_converter(mut self, converter: impl VideoConverter + 'static) -> Self {
        self.video.get_mut().converter = Some(Box::new(converter));
        self
    }

    pub fn with_audio_encoder(mut self, encoder: impl AudioEncoder + 'static) -> Self {
        *self.audio.get_mut() = Some(Box::new(encoder));
        self
    }

    pub fn with_command_transport(mut self, transport: Arc<dyn CommandTransport>) -> Self {
        self.commands = Some(transport);
        self
    }

    pub fn config(&self) -> &StreamerConfig {
        &self.config
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Bind all sockets and start receiving input.
    ///
    /// Nothing is left bound if any step fails.
    pub async fn start(&mut self) -> Result<(), DrcError> {
        if self.session.is_some() {
            return Err(DrcError::AlreadyStarted);
        }

        let endpoints = self.config.resolve()?;
        let runtime = Handle::current();

        let msg_socket = UdpSocket::bind(endpoints.msg_bind)
            .await
            .map_err(|source| DrcError::Bind {
                addr: endpoints.msg_bind,
                source,
            })?;
        let video = VstrmTransport::bind(endpoints.video_dest).await?;
        let audio_local = unspecified_like(endpoints.audio_dest);
        let audio = UdpSocket::bind(audio_local)
            .await
            .map_err(|source| DrcError::Bind {
                addr: audio_local,
                source,
            })?;

        self.input.start().await?;

        let messages = BackgroundTask::spawn(&runtime, "message drain", move |cancel| {
            drain_messages(msg_socket, cancel)
        });
        self.video.get_mut().packetizer = VideoPacketizer::default();

        info!(
            "streamer started: video -> {}, audio -> {}, input on {}",
            endpoints.video_dest,
            endpoints.audio_dest,
            self.input
                .local_addr()
                .map_or_else(|| "?".to_string(), |a| a.to_string()),
        );

        self.session = Some(Session {
            endpoints,
            video,
            audio,
            runtime,
            messages,
        });
        Ok(())
    }

    /// Stop all background work and wait until every socket is released.
    /// Safe to call repeatedly.
    pub async fn stop(&mut self) {
        self.input.stop().await;
        if let Some(session) = self.session.take() {
            let sent = session.video.bytes_sent();
            session.messages.shutdown().await;
            info!("streamer stopped ({sent} video bytes sent)");
        }
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Resolved endpoints, while running.
    pub fn endpoints(&self) -> Option<Endpoints> {
        self.session.as_ref().map(|s| s.endpoints)
    }

    /// Address the input socket is bound to, while running.
    pub fn input_addr(&self) -> Option<SocketAddr> {
        self.input.local_addr()
    }

    /// Total VSTRM bytes sent in the current session.
    pub fn video_bytes_sent(&self) -> u64 {
        self.session.as_ref().map_or(0, |s| s.video.bytes_sent())
    }

    fn session(&self) -> Result<&Session, DrcError> {
        self.session.as_ref().ok_or(DrcError::NotStarted)
    }

    // ── Video ────────────────────────────────────────────────────

    /// Convert, encode, and send one frame.
    ///
    /// `frame` must hold exactly `width x height` pixels of `format`.
    /// Conversion is skipped when the frame is already native and unflipped.
    pub async fn push_vid_frame(
        &self,
        frame: Vec<u8>,
        width: u16,
        height: u16,
        format: PixelFormat,
        flip: FlipMode,
    ) -> Result<(), DrcError> {
        let session = self.session()?;
        let expected = format.frame_len(width, height);
        if frame.len() != expected {
            return Err(DrcError::InvalidFrameSize {
                expected,
                actual: frame.len(),
            });
        }

        let mut guard = self.video.lock().await;
        let pipeline = &mut *guard;
        if pipeline.encoder.is_none() {
            return Err(DrcError::Unsupported("no video encoder"));
        }

        let is_native = format == PixelFormat::Yuv420p
            && width == SCREEN_WIDTH
            && height == SCREEN_HEIGHT
            && flip == FlipMode::NoFlip;

        let native = if is_native {
            frame
        } else {
            let converter = pipeline
                .converter
                .as_mut()
                .ok_or(DrcError::Unsupported("no video converter"))?;
            let converted = converter.convert(frame, width, height, format, flip)?;
            check_native(&converted)?;
            converted
        };

        encode_and_send(pipeline, &session.video, &native).await
    }

    /// Encode and send a frame that is already YUV420P at screen resolution.
    pub async fn push_native_vid_frame(&self, frame: Vec<u8>) -> Result<(), DrcError> {
        let session = self.session()?;
        check_native(&frame)?;

        let mut guard = self.video.lock().await;
        encode_and_send(&mut guard, &session.video, &frame).await
    }

    // ── Audio ────────────────────────────────────────────────────

    /// Forward interleaved stereo 48 kHz samples.
    pub async fn push_aud_samples(&self, samples: &[i16]) -> Result<(), DrcError> {
        let session = self.session()?;
        validate_samples(samples)?;

        let mut guard = self.audio.lock().await;
        let encoder = guard
            .as_mut()
            .ok_or(DrcError::Unsupported("no audio encoder"))?;
        for datagram in encoder.encode(samples)? {
            session
                .audio
                .send_to(&datagram, session.endpoints.audio_dest)
                .await?;
        }
        Ok(())
    }

    // ── Input ────────────────────────────────────────────────────

    /// The latest input snapshot; invalid until the first report arrives.
    pub fn poll_input(&self) -> InputSnapshot {
        self.input.poll()
    }

    pub fn subscribe_input(&self) -> watch::Receiver<InputSnapshot> {
        self.input.subscribe()
    }

    /// Recalibrate the touchscreen; see [`InputReceiver::calibrate_with_points`].
    pub fn calibrate_touch(
        &self,
        raw: [(i32, i32); 2],
        reference: [(i32, i32); 2],
    ) -> Result<(), DrcError> {
        self.input.calibrate_with_points(raw, reference)
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Set the LCD backlight level (`0..=4`).
    ///
    /// With `wait`, returns once the device confirms or the command
    /// ceiling passes. Without it, returns as soon as the command is
    /// issued; a later failure is only logged.
    pub async fn set_lcd_backlight(&self, level: u8, wait: bool) -> Result<(), DrcError> {
        let command = DeviceCommand::lcd_backlight(level)?;
        let reply = self.issue(command)?;

        if wait {
            reply.wait().await?;
            info!("lcd backlight set to {level}");
        } else {
            reply.on_reply(move |result| {
                if let Err(e) = result {
                    warn!("{command} failed: {e}");
                }
            });
        }
        Ok(())
    }

    /// Request the UIC configuration block.
    pub fn get_uic_config(&self) -> Result<PendingReply, DrcError> {
        self.issue(DeviceCommand::GetUicConfig)
    }

    fn issue(&self, command: DeviceCommand) -> Result<PendingReply, DrcError> {
        let session = self.session()?;
        let transport = self
            .commands
            .as_ref()
            .ok_or(DrcError::Unsupported("no command transport"))?;
        trace!("issuing {command}");
        Ok(PendingReply::spawn(
            &session.runtime,
            Arc::clone(transport),
            command,
            self.config.command_timeout(),
        ))
    }
}

impl Default for Streamer {
    fn default() -> Self {
        Self::new(StreamerConfig::default())
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn check_native(frame: &[u8]) -> Result<(), DrcError> {
    if frame.len() != NATIVE_FRAME_SIZE {
        return Err(DrcError::InvalidFrameSize {
            expected: NATIVE_FRAME_SIZE,
            actual: frame.len(),
        });
    }
    Ok(())
}

async fn encode_and_send(
    pipeline: &mut VideoPipeline,
    transport: &VstrmTransport,
    frame: &[u8],
) -> Result<(), DrcError> {
    let encoder = pipeline
        .encoder
        .as_mut()
        .ok_or(DrcError::Unsupported("no video encoder"))?;
    let encoded = encoder.encode(frame)?;
    let packets = pipeline.packetizer.packetize(&encoded)?;
    transport.send_packets(packets).await
}

/// Device messages are not interpreted; keep the socket drained.
async fn drain_messages(socket: UdpSocket, cancel: CancellationToken) {
    let mut buf = [0u8; MSG_BUFFER_SIZE];
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            r = socket.recv_from(&mut buf) => match r {
                Ok((len, peer)) => trace!("message from {peer}: {len} bytes"),
                Err(e) => warn!("message socket error: {e}"),
            },
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

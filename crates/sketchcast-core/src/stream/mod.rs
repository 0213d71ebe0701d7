//! Live streaming of the canvas: media backend seams and the WHIP publish session.

mod audio;
mod whip;

pub use audio::SilentAudio;
pub use whip::{StreamState, WhipSession};

use crate::transport::{BoxFuture, TransportError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the streaming session. Display text is user-facing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("No WHIP URL configured for this workspace")]
    NotConfigured,
    #[error("Load an image or draw something before streaming")]
    NoContent,
    #[error("Stream is already active")]
    AlreadyActive,
    #[error("Stream is still shutting down")]
    Stopping,
    #[error("Stream start was cancelled")]
    Cancelled,
    #[error("Canvas capture failed: {0}")]
    Capture(String),
    #[error("Silent audio track failed: {0}")]
    Audio(String),
    #[error("Peer connection error: {0}")]
    Peer(String),
    #[error("WHIP POST failed: {status} {status_text}")]
    Rejected { status: u16, status_text: String },
    #[error("Empty answer SDP from WHIP server")]
    EmptyAnswer,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Capture and negotiation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Frame rate requested from the surface capture.
    pub fps: u32,
    /// Open the auxiliary `whip-control` data channel.
    pub data_channel: bool,
    /// Attach a silent audio track; many ingest servers reject video-only offers.
    pub silent_audio: bool,
}

impl StreamConfig {
    pub const DATA_CHANNEL_LABEL: &'static str = "whip-control";
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            data_channel: true,
            silent_audio: true,
        }
    }
}

/// A local media track.
pub trait MediaTrack {
    fn kind(&self) -> TrackKind;
    fn stop(&self) -> Result<(), StreamError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

/// A WebRTC peer connection, as far as publishing needs it.
///
/// Negotiation futures are `'static` so no borrow of the session is held across awaits.
pub trait PeerConnection {
    type Track;

    fn add_track(&self, track: &Self::Track) -> Result<(), StreamError>;
    fn create_data_channel(&self, label: &str) -> Result<(), StreamError>;
    fn create_offer(&self) -> BoxFuture<'static, Result<String, StreamError>>;
    fn set_local_description(&self, sdp: &str) -> BoxFuture<'static, Result<(), StreamError>>;
    fn set_remote_description(&self, sdp: &str) -> BoxFuture<'static, Result<(), StreamError>>;
    /// Stop the tracks of every outbound sender.
    fn stop_senders(&self) -> Result<(), StreamError>;
    fn close(&self) -> Result<(), StreamError>;
}

/// Platform media facilities used by [`WhipSession`].
pub trait MediaBackend {
    type Track: MediaTrack + Clone;
    type Audio: SilentAudio<Track = Self::Track>;
    type Peer: PeerConnection<Track = Self::Track>;

    /// Capture the render surface as a live stream; returns its tracks.
    fn capture_surface(&self, fps: u32) -> Result<Vec<Self::Track>, StreamError>;
    fn silent_audio(&self) -> Result<Self::Audio, StreamError>;
    fn create_peer(&self) -> Result<Self::Peer, StreamError>;
}

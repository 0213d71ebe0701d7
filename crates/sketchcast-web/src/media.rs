//! Browser media backend: canvas capture, silent audio and `RTCPeerConnection`.

use crate::fetch::js_error;
use sketchcast_core::stream::{
    MediaBackend, MediaTrack, PeerConnection, SilentAudio, StreamError, TrackKind,
};
use sketchcast_core::transport::BoxFuture;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    AudioContext, HtmlCanvasElement, MediaStream, MediaStreamTrack, OscillatorNode,
    RtcPeerConnection, RtcRtpSender, RtcSdpType, RtcSessionDescriptionInit,
};

#[derive(Clone)]
pub struct WebTrack(MediaStreamTrack);

impl MediaTrack for WebTrack {
    fn kind(&self) -> TrackKind {
        if self.0.kind() == "audio" {
            TrackKind::Audio
        } else {
            TrackKind::Video
        }
    }

    fn stop(&self) -> Result<(), StreamError> {
        self.0.stop();
        Ok(())
    }
}

fn tracks_of(stream: &MediaStream) -> Vec<WebTrack> {
    stream
        .get_tracks()
        .iter()
        .filter_map(|t| t.dyn_into::<MediaStreamTrack>().ok())
        .map(WebTrack)
        .collect()
}

/// Muted oscillator → zero gain → stream destination.
pub struct WebSilentAudio {
    context: AudioContext,
    oscillator: OscillatorNode,
    track: WebTrack,
}

impl WebSilentAudio {
    fn create() -> Result<Self, JsValue> {
        let context = AudioContext::new()?;
        let oscillator = context.create_oscillator()?;
        let gain = context.create_gain()?;
        gain.gain().set_value(0.0);
        oscillator.connect_with_audio_node(&gain)?;
        let destination = context.create_media_stream_destination()?;
        gain.connect_with_audio_node(&destination)?;
        oscillator.start()?;
        let track = destination
            .stream()
            .get_audio_tracks()
            .get(0)
            .dyn_into::<MediaStreamTrack>()
            .map_err(|_| JsValue::from_str("destination has no audio track"))?;
        Ok(Self {
            context,
            oscillator,
            track: WebTrack(track),
        })
    }
}

impl SilentAudio for WebSilentAudio {
    type Track = WebTrack;

    fn track(&self) -> WebTrack {
        self.track.clone()
    }

    fn close(&self) -> Result<(), StreamError> {
        let stopped = self.oscillator.stop().map_err(|e| js_error(&e));
        // close() is async; nothing waits on it
        let closed = self.context.close().map(|_| ()).map_err(|e| js_error(&e));
        stopped.and(closed).map_err(StreamError::Audio)
    }
}

/// One outgoing `RTCPeerConnection` plus the stream its tracks are grouped in.
pub struct WebPeer {
    pc: RtcPeerConnection,
    stream: MediaStream,
}

fn description(kind: RtcSdpType, sdp: &str) -> RtcSessionDescriptionInit {
    let init = RtcSessionDescriptionInit::new(kind);
    init.set_sdp(sdp);
    init
}

impl PeerConnection for WebPeer {
    type Track = WebTrack;

    fn add_track(&self, track: &WebTrack) -> Result<(), StreamError> {
        self.stream.add_track(&track.0);
        self.pc.add_track_0(&track.0, &self.stream);
        Ok(())
    }

    fn create_data_channel(&self, label: &str) -> Result<(), StreamError> {
        self.pc.create_data_channel(label);
        Ok(())
    }

    fn create_offer(&self) -> BoxFuture<'static, Result<String, StreamError>> {
        let promise = self.pc.create_offer();
        Box::pin(async move {
            let offer = JsFuture::from(promise)
                .await
                .map_err(|e| StreamError::Peer(js_error(&e)))?;
            js_sys::Reflect::get(&offer, &"sdp".into())
                .ok()
                .and_then(|sdp| sdp.as_string())
                .ok_or_else(|| StreamError::Peer("offer has no SDP".to_string()))
        })
    }

    fn set_local_description(&self, sdp: &str) -> BoxFuture<'static, Result<(), StreamError>> {
        let promise = self
            .pc
            .set_local_description(&description(RtcSdpType::Offer, sdp));
        Box::pin(async move {
            JsFuture::from(promise)
                .await
                .map(|_| ())
                .map_err(|e| StreamError::Peer(js_error(&e)))
        })
    }

    fn set_remote_description(&self, sdp: &str) -> BoxFuture<'static, Result<(), StreamError>> {
        let promise = self
            .pc
            .set_remote_description(&description(RtcSdpType::Answer, sdp));
        Box::pin(async move {
            JsFuture::from(promise)
                .await
                .map(|_| ())
                .map_err(|e| StreamError::Peer(js_error(&e)))
        })
    }

    fn stop_senders(&self) -> Result<(), StreamError> {
        for sender in self.pc.get_senders().iter() {
            if let Ok(sender) = sender.dyn_into::<RtcRtpSender>() {
                if let Some(track) = sender.track() {
                    track.stop();
                }
            }
        }
        Ok(())
    }

    fn close(&self) -> Result<(), StreamError> {
        self.pc.close();
        Ok(())
    }
}

/// Publishes the drawing surface canvas.
pub struct WebMediaBackend {
    surface: HtmlCanvasElement,
}

impl WebMediaBackend {
    pub fn new(surface: HtmlCanvasElement) -> Self {
        Self { surface }
    }
}

impl MediaBackend for WebMediaBackend {
    type Track = WebTrack;
    type Audio = WebSilentAudio;
    type Peer = WebPeer;

    fn capture_surface(&self, fps: u32) -> Result<Vec<WebTrack>, StreamError> {
        let stream = self
            .surface
            .capture_stream_with_frame_request_rate(fps as f64)
            .map_err(|e| StreamError::Capture(js_error(&e)))?;
        Ok(tracks_of(&stream))
    }

    fn silent_audio(&self) -> Result<WebSilentAudio, StreamError> {
        WebSilentAudio::create().map_err(|e| StreamError::Audio(js_error(&e)))
    }

    fn create_peer(&self) -> Result<WebPeer, StreamError> {
        let pc = RtcPeerConnection::new().map_err(|e| StreamError::Peer(js_error(&e)))?;
        let stream = MediaStream::new().map_err(|e| StreamError::Peer(js_error(&e)))?;
        Ok(WebPeer { pc, stream })
    }
}

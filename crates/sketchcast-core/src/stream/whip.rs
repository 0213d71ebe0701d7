//! WHIP publish session: capture, negotiate, and tear down.

use super::{MediaBackend, MediaTrack, PeerConnection, SilentAudio, StreamConfig, StreamError};
use crate::transport::{HttpRequest, HttpTransport};
use std::cell::{Cell, RefCell};
use url::Url;

const SDP_CONTENT_TYPE: &str = "application/sdp";

/// Lifecycle of a [`WhipSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    #[default]
    Idle,
    Starting,
    Live,
    Stopping,
}

/// Everything a publish attempt has acquired so far.
struct Resources<B: MediaBackend> {
    tracks: Vec<B::Track>,
    audio: Option<B::Audio>,
    peer: Option<B::Peer>,
    resource_url: Option<String>,
}

impl<B: MediaBackend> Default for Resources<B> {
    fn default() -> Self {
        Self {
            tracks: Vec::new(),
            audio: None,
            peer: None,
            resource_url: None,
        }
    }
}

/// Publishes the canvas to a WHIP endpoint.
///
/// Methods take `&self` so that `stop()` can run while a `start()` is suspended
/// in negotiation. Acquired resources are recorded as soon as they exist, so a
/// stop at any point releases them; the suspended start notices the bumped
/// generation when it resumes and reports [`StreamError::Cancelled`].
pub struct WhipSession<B: MediaBackend, H: HttpTransport> {
    backend: B,
    http: H,
    config: StreamConfig,
    state: Cell<StreamState>,
    generation: Cell<u64>,
    resources: RefCell<Resources<B>>,
}

impl<B: MediaBackend, H: HttpTransport> WhipSession<B, H> {
    pub fn new(backend: B, http: H, config: StreamConfig) -> Self {
        Self {
            backend,
            http,
            config,
            state: Cell::new(StreamState::Idle),
            generation: Cell::new(0),
            resources: RefCell::new(Resources::default()),
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn state(&self) -> StreamState {
        self.state.get()
    }

    pub fn is_live(&self) -> bool {
        self.state.get() == StreamState::Live
    }

    /// Starting or live.
    pub fn is_active(&self) -> bool {
        matches!(self.state.get(), StreamState::Starting | StreamState::Live)
    }

    /// Remote resource to DELETE on teardown, if the server returned one.
    pub fn resource_url(&self) -> Option<String> {
        self.resources.borrow().resource_url.clone()
    }

    /// Number of local tracks currently held.
    pub fn track_count(&self) -> usize {
        self.resources.borrow().tracks.len()
    }

    /// Start publishing. Refused while another start or a live stream exists.
    pub async fn start(&self, whip_url: Option<&str>, has_content: bool) -> Result<(), StreamError> {
        match self.state.get() {
            StreamState::Starting | StreamState::Live => return Err(StreamError::AlreadyActive),
            StreamState::Stopping => return Err(StreamError::Stopping),
            StreamState::Idle => {}
        }
        let whip_url = whip_url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(StreamError::NotConfigured)?;
        if !has_content {
            return Err(StreamError::NoContent);
        }

        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        self.state.set(StreamState::Starting);
        log::info!("Starting WHIP stream to {}", whip_url);

        match self.negotiate(whip_url, generation).await {
            Ok(()) => {
                self.state.set(StreamState::Live);
                log::info!("WHIP stream live");
                Ok(())
            }
            Err(StreamError::Cancelled) => {
                log::info!("WHIP start cancelled by stop()");
                Err(StreamError::Cancelled)
            }
            Err(e) => {
                log::error!("WHIP start failed: {}", e);
                if self.generation.get() == generation {
                    self.teardown().await;
                }
                Err(e)
            }
        }
    }

    /// Stop publishing. Safe to call in any state; a no-op when idle.
    pub async fn stop(&self) {
        match self.state.get() {
            StreamState::Idle | StreamState::Stopping => {
                log::debug!("stop() ignored in state {:?}", self.state.get());
                return;
            }
            StreamState::Starting => log::info!("Cancelling WHIP start"),
            StreamState::Live => log::info!("Stopping WHIP stream"),
        }
        self.generation.set(self.generation.get() + 1);
        self.teardown().await;
    }

    fn check(&self, generation: u64) -> Result<(), StreamError> {
        if self.generation.get() == generation {
            Ok(())
        } else {
            Err(StreamError::Cancelled)
        }
    }

    fn with_peer<R>(&self, f: impl FnOnce(&B::Peer) -> R) -> Result<R, StreamError> {
        let resources = self.resources.borrow();
        let peer = resources
            .peer
            .as_ref()
            .ok_or_else(|| StreamError::Peer("connection already closed".to_string()))?;
        Ok(f(peer))
    }

    async fn negotiate(&self, whip_url: &str, generation: u64) -> Result<(), StreamError> {
        let mut tracks = self.backend.capture_surface(self.config.fps)?;
        if tracks.is_empty() {
            return Err(StreamError::Capture("capture produced no tracks".to_string()));
        }
        self.resources.borrow_mut().tracks.extend(tracks.iter().cloned());

        if self.config.silent_audio {
            match self.backend.silent_audio() {
                Ok(audio) => {
                    let track = audio.track();
                    tracks.push(track.clone());
                    let mut resources = self.resources.borrow_mut();
                    resources.tracks.push(track);
                    resources.audio = Some(audio);
                }
                Err(e) => log::warn!("Publishing without audio: {}", e),
            }
        }

        let peer = self.backend.create_peer()?;
        self.resources.borrow_mut().peer = Some(peer);

        let offer = self.with_peer(|peer| {
            for track in &tracks {
                peer.add_track(track)?;
            }
            if self.config.data_channel {
                if let Err(e) = peer.create_data_channel(StreamConfig::DATA_CHANNEL_LABEL) {
                    log::warn!("Data channel unavailable: {}", e);
                }
            }
            Ok::<_, StreamError>(peer.create_offer())
        })??;
        let offer = offer.await;
        self.check(generation)?;
        let offer = offer?;

        let local = self.with_peer(|peer| peer.set_local_description(&offer))?.await;
        self.check(generation)?;
        local?;

        log::debug!("POST offer ({} bytes) to {}", offer.len(), whip_url);
        let response = self
            .http
            .send(HttpRequest::post(whip_url, SDP_CONTENT_TYPE, offer))
            .await;
        let location = response
            .as_ref()
            .ok()
            .filter(|r| r.is_success())
            .and_then(|r| r.header("Location"))
            .and_then(|loc| resolve_resource_url(whip_url, loc));
        if self.check(generation).is_err() {
            // The server created a resource nobody will tear down
            if let Some(url) = location {
                self.release_remote(&url).await;
            }
            return Err(StreamError::Cancelled);
        }
        let response = response?;
        if !response.is_success() {
            return Err(StreamError::Rejected {
                status: response.status,
                status_text: response.status_text,
            });
        }
        if location.is_none() {
            log::debug!("WHIP response had no usable Location header");
        }
        self.resources.borrow_mut().resource_url = location;

        let answer = response.body;
        if answer.trim().is_empty() {
            return Err(StreamError::EmptyAnswer);
        }
        let remote = self.with_peer(|peer| peer.set_remote_description(&answer))?.await;
        self.check(generation)?;
        remote
    }

    /// Release everything. Each step runs even if the previous one failed.
    async fn teardown(&self) {
        self.state.set(StreamState::Stopping);
        let resources = std::mem::take(&mut *self.resources.borrow_mut());

        if let Some(url) = &resources.resource_url {
            self.release_remote(url).await;
        }
        if let Some(peer) = &resources.peer {
            if let Err(e) = peer.stop_senders() {
                log::warn!("Failed to stop senders: {}", e);
            }
            if let Err(e) = peer.close() {
                log::warn!("Failed to close peer connection: {}", e);
            }
        }
        for track in &resources.tracks {
            if let Err(e) = track.stop() {
                log::warn!("Failed to stop {:?} track: {}", track.kind(), e);
            }
        }
        if let Some(audio) = &resources.audio {
            if let Err(e) = audio.close() {
                log::warn!("Failed to close silent audio: {}", e);
            }
        }

        self.state.set(StreamState::Idle);
        log::info!("WHIP stream stopped");
    }

    async fn release_remote(&self, url: &str) {
        match self.http.send(HttpRequest::delete(url)).await {
            Ok(response) if response.is_success() => log::debug!("Released WHIP resource {}", url),
            Ok(response) => log::warn!(
                "WHIP DELETE {} returned {} {}",
                url,
                response.status,
                response.status_text
            ),
            Err(e) => log::warn!("WHIP DELETE {} failed: {}", url, e),
        }
    }
}

/// Resolve a (possibly relative) `Location` header against the endpoint URL.
fn resolve_resource_url(endpoint: &str, location: &str) -> Option<String> {
    let location = location.trim();
    if location.is_empty() {
        return None;
    }
    match Url::parse(endpoint).and_then(|base| base.join(location)) {
        Ok(url) => Some(url.into()),
        Err(e) => {
            log::warn!("Ignoring unusable Location '{}': {}", location, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::TrackKind;
    use crate::transport::{BoxFuture, HttpResponse, Method, TransportError};
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;
    use std::rc::Rc;
    use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

    const WHIP_URL: &str = "https://ingest.example.com/live/whip/abc";

    fn noop_waker() -> Waker {
        fn dummy_raw_waker() -> RawWaker {
            fn no_op(_: *const ()) {}
            fn clone(_: *const ()) -> RawWaker {
                dummy_raw_waker()
            }
            static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
            RawWaker::new(std::ptr::null(), &VTABLE)
        }
        unsafe { Waker::from_raw(dummy_raw_waker()) }
    }

    fn block_on<F: Future>(f: F) -> F::Output {
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut f = std::pin::pin!(f);
        loop {
            if let Poll::Ready(result) = f.as_mut().poll(&mut cx) {
                return result;
            }
        }
    }

    #[derive(Default)]
    struct Tally {
        captures: Cell<u32>,
        peers: Cell<u32>,
        added_tracks: Cell<u32>,
        data_channels: Cell<u32>,
        closed_peers: Cell<u32>,
        stopped_senders: Cell<u32>,
        closed_audio: Cell<u32>,
        remote_sdp: RefCell<Option<String>>,
        /// While set, `create_offer` stays pending.
        hold_offer: Cell<bool>,
        fail_audio: Cell<bool>,
    }

    #[derive(Clone)]
    struct MockTrack {
        kind: TrackKind,
        stopped: Rc<Cell<bool>>,
    }

    impl MediaTrack for MockTrack {
        fn kind(&self) -> TrackKind {
            self.kind
        }
        fn stop(&self) -> Result<(), StreamError> {
            self.stopped.set(true);
            Ok(())
        }
    }

    struct MockAudio {
        track: MockTrack,
        tally: Rc<Tally>,
    }

    impl SilentAudio for MockAudio {
        type Track = MockTrack;
        fn track(&self) -> MockTrack {
            self.track.clone()
        }
        fn close(&self) -> Result<(), StreamError> {
            self.tally.closed_audio.set(self.tally.closed_audio.get() + 1);
            Err(StreamError::Audio("context already closed".to_string()))
        }
    }

    struct HeldOffer(Rc<Tally>);

    impl Future for HeldOffer {
        type Output = Result<String, StreamError>;
        fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
            if self.0.hold_offer.get() {
                Poll::Pending
            } else {
                Poll::Ready(Ok("v=0 offer".to_string()))
            }
        }
    }

    struct MockPeer {
        tally: Rc<Tally>,
    }

    impl PeerConnection for MockPeer {
        type Track = MockTrack;

        fn add_track(&self, _track: &MockTrack) -> Result<(), StreamError> {
            self.tally.added_tracks.set(self.tally.added_tracks.get() + 1);
            Ok(())
        }
        fn create_data_channel(&self, label: &str) -> Result<(), StreamError> {
            assert_eq!(label, "whip-control");
            self.tally.data_channels.set(self.tally.data_channels.get() + 1);
            Ok(())
        }
        fn create_offer(&self) -> BoxFuture<'static, Result<String, StreamError>> {
            Box::pin(HeldOffer(self.tally.clone()))
        }
        fn set_local_description(&self, _sdp: &str) -> BoxFuture<'static, Result<(), StreamError>> {
            Box::pin(async { Ok(()) })
        }
        fn set_remote_description(&self, sdp: &str) -> BoxFuture<'static, Result<(), StreamError>> {
            *self.tally.remote_sdp.borrow_mut() = Some(sdp.to_string());
            Box::pin(async { Ok(()) })
        }
        fn stop_senders(&self) -> Result<(), StreamError> {
            self.tally.stopped_senders.set(self.tally.stopped_senders.get() + 1);
            Ok(())
        }
        fn close(&self) -> Result<(), StreamError> {
            self.tally.closed_peers.set(self.tally.closed_peers.get() + 1);
            Ok(())
        }
    }

    #[derive(Clone)]
    struct MockBackend {
        tally: Rc<Tally>,
        tracks: Rc<RefCell<Vec<MockTrack>>>,
    }

    impl MockBackend {
        fn new() -> Self {
            Self {
                tally: Rc::new(Tally::default()),
                tracks: Rc::new(RefCell::new(Vec::new())),
            }
        }

        fn track(&self, kind: TrackKind) -> MockTrack {
            let track = MockTrack {
                kind,
                stopped: Rc::new(Cell::new(false)),
            };
            self.tracks.borrow_mut().push(track.clone());
            track
        }

        fn all_tracks_stopped(&self) -> bool {
            self.tracks.borrow().iter().all(|t| t.stopped.get())
        }
    }

    impl MediaBackend for MockBackend {
        type Track = MockTrack;
        type Audio = MockAudio;
        type Peer = MockPeer;

        fn capture_surface(&self, fps: u32) -> Result<Vec<MockTrack>, StreamError> {
            assert_eq!(fps, 30);
            self.tally.captures.set(self.tally.captures.get() + 1);
            Ok(vec![self.track(TrackKind::Video)])
        }
        fn silent_audio(&self) -> Result<MockAudio, StreamError> {
            if self.tally.fail_audio.get() {
                return Err(StreamError::Audio("AudioContext unavailable".to_string()));
            }
            Ok(MockAudio {
                track: self.track(TrackKind::Audio),
                tally: self.tally.clone(),
            })
        }
        fn create_peer(&self) -> Result<MockPeer, StreamError> {
            self.tally.peers.set(self.tally.peers.get() + 1);
            Ok(MockPeer {
                tally: self.tally.clone(),
            })
        }
    }

    #[derive(Default)]
    struct MockHttp {
        responses: RefCell<VecDeque<Result<HttpResponse, TransportError>>>,
        requests: RefCell<Vec<HttpRequest>>,
    }

    impl MockHttp {
        fn queue(&self, response: Result<HttpResponse, TransportError>) {
            self.responses.borrow_mut().push_back(response);
        }

        fn methods(&self) -> Vec<Method> {
            self.requests.borrow().iter().map(|r| r.method).collect()
        }
    }

    impl HttpTransport for MockHttp {
        fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>> {
            self.requests.borrow_mut().push(request);
            let response = self
                .responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(HttpResponse::new(200, "OK", "")));
            Box::pin(async move { response })
        }
    }

    fn answer() -> HttpResponse {
        HttpResponse::new(201, "Created", "v=0 answer").with_header("location", "/live/whip/abc/res-1")
    }

    fn session() -> (WhipSession<MockBackend, Rc<MockHttp>>, MockBackend, Rc<MockHttp>) {
        let backend = MockBackend::new();
        let http = Rc::new(MockHttp::default());
        let session = WhipSession::new(backend.clone(), http.clone(), StreamConfig::default());
        (session, backend, http)
    }

    #[test]
    fn test_start_negotiates_in_order() {
        let (session, backend, http) = session();
        http.queue(Ok(answer()));

        block_on(session.start(Some(WHIP_URL), true)).unwrap();

        assert_eq!(session.state(), StreamState::Live);
        assert_eq!(backend.tally.added_tracks.get(), 2);
        assert_eq!(backend.tally.data_channels.get(), 1);
        assert_eq!(backend.tally.remote_sdp.borrow().as_deref(), Some("v=0 answer"));
        assert_eq!(
            session.resource_url().as_deref(),
            Some("https://ingest.example.com/live/whip/abc/res-1")
        );

        let requests = http.requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::Post);
        assert_eq!(requests[0].url, WHIP_URL);
        assert_eq!(requests[0].body.as_deref(), Some("v=0 offer"));
        assert!(requests[0]
            .headers
            .contains(&("Content-Type".to_string(), "application/sdp".to_string())));
    }

    #[test]
    fn test_preconditions_are_reported() {
        let (session, backend, _http) = session();
        assert_eq!(block_on(session.start(None, true)), Err(StreamError::NotConfigured));
        assert_eq!(block_on(session.start(Some("  "), true)), Err(StreamError::NotConfigured));
        assert_eq!(block_on(session.start(Some(WHIP_URL), false)), Err(StreamError::NoContent));
        assert_eq!(session.state(), StreamState::Idle);
        assert_eq!(backend.tally.captures.get(), 0);
    }

    #[test]
    fn test_start_while_live_is_refused() {
        let (session, backend, http) = session();
        http.queue(Ok(answer()));
        block_on(session.start(Some(WHIP_URL), true)).unwrap();

        assert_eq!(
            block_on(session.start(Some(WHIP_URL), true)),
            Err(StreamError::AlreadyActive)
        );
        assert_eq!(session.state(), StreamState::Live);
        assert_eq!(backend.tally.captures.get(), 1);
        assert_eq!(backend.tally.peers.get(), 1);
        assert_eq!(session.track_count(), 2);
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let (session, backend, http) = session();
        block_on(session.stop());
        assert_eq!(session.state(), StreamState::Idle);
        assert!(http.requests.borrow().is_empty());
        assert_eq!(backend.tally.closed_peers.get(), 0);
    }

    #[test]
    fn test_stop_releases_everything() {
        let (session, backend, http) = session();
        http.queue(Ok(answer()));
        block_on(session.start(Some(WHIP_URL), true)).unwrap();
        block_on(session.stop());

        assert_eq!(session.state(), StreamState::Idle);
        assert_eq!(http.methods(), vec![Method::Post, Method::Delete]);
        assert_eq!(
            http.requests.borrow()[1].url,
            "https://ingest.example.com/live/whip/abc/res-1"
        );
        assert_eq!(backend.tally.stopped_senders.get(), 1);
        assert_eq!(backend.tally.closed_peers.get(), 1);
        assert_eq!(backend.tally.closed_audio.get(), 1);
        assert!(backend.all_tracks_stopped());
        assert_eq!(session.track_count(), 0);

        block_on(session.stop());
        assert_eq!(http.methods().len(), 2);
    }

    #[test]
    fn test_teardown_survives_delete_failure() {
        let (session, backend, http) = session();
        http.queue(Ok(answer()));
        http.queue(Err(TransportError::Network("connection reset".to_string())));
        block_on(session.start(Some(WHIP_URL), true)).unwrap();
        block_on(session.stop());

        assert_eq!(session.state(), StreamState::Idle);
        assert_eq!(backend.tally.closed_peers.get(), 1);
        assert!(backend.all_tracks_stopped());
    }

    #[test]
    fn test_rejected_post_tears_down() {
        let (session, backend, http) = session();
        http.queue(Ok(HttpResponse::new(403, "Forbidden", "nope")));

        let err = block_on(session.start(Some(WHIP_URL), true)).unwrap_err();
        assert_eq!(err.to_string(), "WHIP POST failed: 403 Forbidden");
        assert_eq!(session.state(), StreamState::Idle);
        assert_eq!(http.methods(), vec![Method::Post]);
        assert_eq!(backend.tally.closed_peers.get(), 1);
        assert!(backend.all_tracks_stopped());
    }

    #[test]
    fn test_empty_answer_releases_remote() {
        let (session, backend, http) = session();
        http.queue(Ok(HttpResponse::new(201, "Created", "  ").with_header("Location", "res-9")));

        let err = block_on(session.start(Some(WHIP_URL), true)).unwrap_err();
        assert_eq!(err, StreamError::EmptyAnswer);
        assert_eq!(http.methods(), vec![Method::Post, Method::Delete]);
        assert_eq!(
            http.requests.borrow()[1].url,
            "https://ingest.example.com/live/whip/res-9"
        );
        assert!(backend.all_tracks_stopped());
    }

    #[test]
    fn test_transport_error_on_post() {
        let (session, backend, http) = session();
        http.queue(Err(TransportError::Network("offline".to_string())));
        let err = block_on(session.start(Some(WHIP_URL), true)).unwrap_err();
        assert!(matches!(err, StreamError::Transport(_)));
        assert_eq!(session.state(), StreamState::Idle);
        assert_eq!(backend.tally.closed_peers.get(), 1);
    }

    #[test]
    fn test_stop_during_start_cancels() {
        let (session, backend, http) = session();
        backend.tally.hold_offer.set(true);

        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut start = Box::pin(session.start(Some(WHIP_URL), true));
        assert!(start.as_mut().poll(&mut cx).is_pending());
        assert_eq!(session.state(), StreamState::Starting);
        assert_eq!(
            block_on(session.start(Some(WHIP_URL), true)),
            Err(StreamError::AlreadyActive)
        );

        block_on(session.stop());
        assert_eq!(session.state(), StreamState::Idle);
        assert_eq!(backend.tally.closed_peers.get(), 1);
        assert!(backend.all_tracks_stopped());

        backend.tally.hold_offer.set(false);
        match start.as_mut().poll(&mut cx) {
            Poll::Ready(result) => assert_eq!(result, Err(StreamError::Cancelled)),
            Poll::Pending => panic!("start should resume"),
        }
        assert!(http.requests.borrow().is_empty());
        assert_eq!(session.state(), StreamState::Idle);
    }

    #[test]
    fn test_restart_after_stop() {
        let (session, backend, http) = session();
        http.queue(Ok(answer()));
        block_on(session.start(Some(WHIP_URL), true)).unwrap();
        block_on(session.stop());
        http.queue(Ok(answer()));
        block_on(session.start(Some(WHIP_URL), true)).unwrap();

        assert!(session.is_live());
        assert_eq!(backend.tally.captures.get(), 2);
        assert_eq!(session.track_count(), 2);
    }

    #[test]
    fn test_without_audio_or_data_channel() {
        let backend = MockBackend::new();
        let http = Rc::new(MockHttp::default());
        http.queue(Ok(answer()));
        let session = WhipSession::new(
            backend.clone(),
            http.clone(),
            StreamConfig {
                data_channel: false,
                silent_audio: false,
                ..Default::default()
            },
        );
        block_on(session.start(Some(WHIP_URL), true)).unwrap();
        assert_eq!(backend.tally.added_tracks.get(), 1);
        assert_eq!(backend.tally.data_channels.get(), 0);
    }

    #[test]
    fn test_audio_failure_publishes_video_only() {
        let (session, backend, http) = session();
        backend.tally.fail_audio.set(true);
        http.queue(Ok(answer()));
        block_on(session.start(Some(WHIP_URL), true)).unwrap();
        assert!(session.is_live());
        assert_eq!(backend.tally.added_tracks.get(), 1);

        block_on(session.stop());
        assert_eq!(backend.tally.closed_audio.get(), 0);
        assert!(backend.all_tracks_stopped());
    }

    #[test]
    fn test_resolve_resource_url() {
        assert_eq!(
            resolve_resource_url("https://a.example/whip/x", "https://b.example/r/1").as_deref(),
            Some("https://b.example/r/1")
        );
        assert_eq!(
            resolve_resource_url("https://a.example/whip/x", "/r/2").as_deref(),
            Some("https://a.example/r/2")
        );
        assert_eq!(resolve_resource_url("https://a.example/whip/x", ""), None);
    }
}

use crate::config::StreamingConfig;
use crate::error::{Error, Result};
use crate::registry::models::{Camera, Protocol};
use log::{debug, info, warn};
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::watch;
use uuid::Uuid;

/// Playback lifecycle of a live view. Transient, owned by one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Loading,
    Playing,
    Paused,
    Buffering,
    Error,
    Reconnecting,
}

impl Display for StreamState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => write!(f, "loading"),
            Self::Playing => write!(f, "playing"),
            Self::Paused => write!(f, "paused"),
            Self::Buffering => write!(f, "buffering"),
            Self::Error => write!(f, "error"),
            Self::Reconnecting => write!(f, "reconnecting"),
        }
    }
}

/// Lifecycle events emitted by the opaque media player
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    Buffering,
    Playing,
    Paused,
    StreamEnded,
    Progress,
    Error(String),
}

/// The narrow surface a live view needs from whatever engine renders the
/// stream. The session never owns the player; the presentation layer does.
pub trait MediaPlayer: Send + Sync {
    fn start(&self, url: &str) -> Result<()>;
    fn stop(&self);
}

/// Connection URL for a camera. Credentials are embedded in the clear by
/// design. WebRTC has no URL scheme here and fails fast.
pub fn connection_url(camera: &Camera) -> Result<String> {
    match camera.protocol {
        Protocol::Rtsp => {
            let auth = if !camera.username.is_empty() && !camera.password.is_empty() {
                format!("{}:{}@", camera.username, camera.password)
            } else {
                String::new()
            };
            Ok(format!("rtsp://{}{}:{}", auth, camera.ip, camera.port))
        }
        Protocol::WebRtc => Err(Error::Unsupported(
            "WebRTC streaming is not supported yet".to_string(),
        )),
    }
}

/// Player init options for stable RTSP playback: generous caches, TCP
/// transport, no audio for CCTV feeds.
pub fn source_options(config: &StreamingConfig) -> Vec<String> {
    let mut options = vec![
        format!("--network-caching={}", config.network_caching_ms),
        format!("--rtsp-caching={}", config.rtsp_caching_ms),
        format!("--live-caching={}", config.live_caching_ms),
        format!("--file-caching={}", config.file_caching_ms),
    ];
    if config.rtsp_tcp {
        options.push("--rtsp-tcp".to_string());
    }
    options.push("--codec=avcodec".to_string());
    if config.hardware_decode {
        options.push("--avcodec-hw=any".to_string());
    }
    if !config.audio {
        options.push("--no-audio".to_string());
    }
    options
}

/// In-memory state machine reflecting one live connection's lifecycle,
/// driven only by player events and explicit reconnects.
pub struct StreamSession {
    id: Uuid,
    url: Option<String>,
    retry_count: AtomicU32,
    state_tx: watch::Sender<StreamState>,
}

impl StreamSession {
    /// Create a session for a camera. An unsupported protocol surfaces as
    /// an immediate error state instead of a connection attempt.
    pub fn new(camera: &Camera) -> Self {
        let (url, initial) = match connection_url(camera) {
            Ok(url) => (Some(url), StreamState::Loading),
            Err(e) => {
                warn!("No stream for camera {}: {}", camera.id, e);
                (None, StreamState::Error)
            }
        };
        let (state_tx, _) = watch::channel(initial);
        Self {
            id: Uuid::new_v4(),
            url,
            retry_count: AtomicU32::new(0),
            state_tx,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn url(&self) -> Result<&str> {
        self.url.as_deref().ok_or_else(|| {
            Error::Unsupported("WebRTC streaming is not supported yet".to_string())
        })
    }

    pub fn state(&self) -> StreamState {
        *self.state_tx.borrow()
    }

    /// Watch channel carrying every state change, for the view to render.
    pub fn subscribe(&self) -> watch::Receiver<StreamState> {
        self.state_tx.subscribe()
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count.load(Ordering::Relaxed)
    }

    /// Key the presentation layer rebuilds the player under. It changes on
    /// every reconnect so a stalled connection is never reused.
    pub fn player_key(&self) -> String {
        format!("{}-{}", self.url.as_deref().unwrap_or(""), self.retry_count())
    }

    /// Derive the connection URL and hand it to the player.
    pub fn start(&self, player: &dyn MediaPlayer) -> Result<()> {
        match self.url() {
            Ok(url) => player.start(url),
            Err(e) => {
                self.transition(StreamState::Error);
                Err(e)
            }
        }
    }

    /// Apply a player lifecycle event to the session state.
    pub fn handle_event(&self, event: PlayerEvent) {
        let next = match event {
            PlayerEvent::Playing => Some(StreamState::Playing),
            // progress while still spinning up means frames are flowing
            PlayerEvent::Progress => match self.state() {
                StreamState::Loading | StreamState::Buffering => Some(StreamState::Playing),
                _ => None,
            },
            PlayerEvent::Buffering => Some(StreamState::Buffering),
            PlayerEvent::Paused => Some(StreamState::Paused),
            PlayerEvent::StreamEnded => Some(StreamState::Reconnecting),
            PlayerEvent::Error(reason) => {
                warn!("Stream {}: player error: {}", self.id, reason);
                Some(StreamState::Error)
            }
        };
        if let Some(next) = next {
            self.transition(next);
        }
    }

    /// Request a state from outside the player's own signals. A loading
    /// downgrade while actively playing is dropped, so spurious reconnect
    /// probes cannot flicker the view.
    pub fn request_state(&self, state: StreamState) {
        if self.state() == StreamState::Playing && state == StreamState::Loading {
            debug!("Stream {}: ignoring loading request while playing", self.id);
            return;
        }
        self.transition(state);
    }

    /// Reset to loading and bump the retry counter; the caller recreates
    /// the player resource under the new `player_key`.
    pub fn reconnect(&self) {
        let attempt = self.retry_count.fetch_add(1, Ordering::Relaxed) + 1;
        info!("Stream {}: reconnect attempt {}", self.id, attempt);
        self.transition(StreamState::Loading);
    }

    fn transition(&self, next: StreamState) {
        let current = self.state();
        if current != next {
            debug!("Stream {}: {} -> {}", self.id, current, next);
            self.state_tx.send_replace(next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::models::CameraStatus;
    use std::sync::Mutex;

    fn camera(protocol: Protocol, username: &str, password: &str) -> Camera {
        Camera {
            id: "cam-1".to_string(),
            name: "Front Door".to_string(),
            ip: "10.0.0.5".to_string(),
            port: "554".to_string(),
            username: username.to_string(),
            password: password.to_string(),
            protocol,
            status: CameraStatus::Online,
            location: "Entrance".to_string(),
            last_seen: "Just now".to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn url_embeds_credentials_when_both_present() {
        let url = connection_url(&camera(Protocol::Rtsp, "u", "p")).unwrap();
        assert_eq!(url, "rtsp://u:p@10.0.0.5:554");
    }

    #[test]
    fn url_skips_auth_when_a_credential_is_empty() {
        let url = connection_url(&camera(Protocol::Rtsp, "", "p")).unwrap();
        assert_eq!(url, "rtsp://10.0.0.5:554");
    }

    #[test]
    fn webrtc_fails_fast() {
        let err = connection_url(&camera(Protocol::WebRtc, "u", "p")).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));

        let session = StreamSession::new(&camera(Protocol::WebRtc, "u", "p"));
        assert_eq!(session.state(), StreamState::Error);
        assert!(session.url().is_err());
    }

    #[test]
    fn event_table_follows_the_player() {
        let session = StreamSession::new(&camera(Protocol::Rtsp, "u", "p"));
        assert_eq!(session.state(), StreamState::Loading);

        session.handle_event(PlayerEvent::Buffering);
        assert_eq!(session.state(), StreamState::Buffering);

        session.handle_event(PlayerEvent::Playing);
        assert_eq!(session.state(), StreamState::Playing);

        // buffering from the player itself is an honest downgrade
        session.handle_event(PlayerEvent::Buffering);
        assert_eq!(session.state(), StreamState::Buffering);

        session.handle_event(PlayerEvent::Paused);
        assert_eq!(session.state(), StreamState::Paused);

        session.handle_event(PlayerEvent::StreamEnded);
        assert_eq!(session.state(), StreamState::Reconnecting);

        session.handle_event(PlayerEvent::Error("timeout".to_string()));
        assert_eq!(session.state(), StreamState::Error);
    }

    #[test]
    fn progress_promotes_only_while_spinning_up() {
        let session = StreamSession::new(&camera(Protocol::Rtsp, "u", "p"));
        session.handle_event(PlayerEvent::Progress);
        assert_eq!(session.state(), StreamState::Playing);

        session.handle_event(PlayerEvent::Paused);
        session.handle_event(PlayerEvent::Progress);
        assert_eq!(session.state(), StreamState::Paused);
    }

    #[test]
    fn loading_request_is_suppressed_while_playing() {
        let session = StreamSession::new(&camera(Protocol::Rtsp, "u", "p"));
        session.handle_event(PlayerEvent::Playing);

        session.request_state(StreamState::Loading);
        assert_eq!(session.state(), StreamState::Playing);

        // any other requested state still goes through
        session.request_state(StreamState::Paused);
        assert_eq!(session.state(), StreamState::Paused);
        session.request_state(StreamState::Loading);
        assert_eq!(session.state(), StreamState::Loading);
    }

    #[test]
    fn reconnect_resets_state_and_rekeys_the_player() {
        let session = StreamSession::new(&camera(Protocol::Rtsp, "u", "p"));
        session.handle_event(PlayerEvent::Error("timeout".to_string()));
        assert_eq!(session.player_key(), "rtsp://u:p@10.0.0.5:554-0");

        session.reconnect();
        assert_eq!(session.state(), StreamState::Loading);
        assert_eq!(session.retry_count(), 1);
        assert_eq!(session.player_key(), "rtsp://u:p@10.0.0.5:554-1");
    }

    #[test]
    fn subscribers_see_state_changes() {
        let session = StreamSession::new(&camera(Protocol::Rtsp, "u", "p"));
        let rx = session.subscribe();
        session.handle_event(PlayerEvent::Playing);
        assert_eq!(*rx.borrow(), StreamState::Playing);
    }

    struct RecordingPlayer {
        started: Mutex<Vec<String>>,
    }

    impl MediaPlayer for RecordingPlayer {
        fn start(&self, url: &str) -> crate::Result<()> {
            self.started.lock().unwrap().push(url.to_string());
            Ok(())
        }

        fn stop(&self) {}
    }

    #[test]
    fn start_hands_the_derived_url_to_the_player() {
        let player = RecordingPlayer {
            started: Mutex::new(Vec::new()),
        };
        let session = StreamSession::new(&camera(Protocol::Rtsp, "u", "p"));
        session.start(&player).unwrap();
        assert_eq!(
            player.started.lock().unwrap().as_slice(),
            &["rtsp://u:p@10.0.0.5:554".to_string()]
        );
    }

    #[test]
    fn source_options_reflect_streaming_config() {
        let config = StreamingConfig::default();
        let options = source_options(&config);
        assert!(options.contains(&"--network-caching=2000".to_string()));
        assert!(options.contains(&"--rtsp-tcp".to_string()));
        assert!(options.contains(&"--no-audio".to_string()));

        let options = source_options(&StreamingConfig {
            rtsp_tcp: false,
            audio: true,
            ..StreamingConfig::default()
        });
        assert!(!options.contains(&"--rtsp-tcp".to_string()));
        assert!(!options.contains(&"--no-audio".to_string()));
    }
}

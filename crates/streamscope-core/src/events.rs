//! Collaborator event sets and the inbound event channel
//!
//! Each collaborator gets a closed event enumeration carrying its wire name.
//! Collaborators publish through a [`Notifier`]; every notifier writes into the
//! same unbounded channel, so envelopes reach the dispatcher in emission order
//! without any shared mutable state.

use crate::media::TrackId;
use crate::types::SessionId;
use serde_json::Value;
use tokio::sync::mpsc;

/// Events subscribed on the adaptive (hls.js) engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdaptiveEvent {
    ManifestParsed,
    FragParsingMetadata,
    FragParsingInitSegment,
    FragChanged,
    FragLoaded,
    FragDecrypted,
    FragParsingUserdata,
    FragParsingData,
    Error,
}

impl AdaptiveEvent {
    /// Fragment events mirrored into the metadata log
    pub const FORWARDED: [AdaptiveEvent; 7] = [
        AdaptiveEvent::FragParsingMetadata,
        AdaptiveEvent::FragParsingInitSegment,
        AdaptiveEvent::FragChanged,
        AdaptiveEvent::FragLoaded,
        AdaptiveEvent::FragDecrypted,
        AdaptiveEvent::FragParsingUserdata,
        AdaptiveEvent::FragParsingData,
    ];

    /// Wire name used by the engine
    pub fn name(&self) -> &'static str {
        match self {
            AdaptiveEvent::ManifestParsed => "hlsManifestParsed",
            AdaptiveEvent::FragParsingMetadata => "hlsFragParsingMetadata",
            AdaptiveEvent::FragParsingInitSegment => "hlsFragParsingInitSegment",
            AdaptiveEvent::FragChanged => "hlsFragChanged",
            AdaptiveEvent::FragLoaded => "hlsFragLoaded",
            AdaptiveEvent::FragDecrypted => "hlsFragDecrypted",
            AdaptiveEvent::FragParsingUserdata => "hlsFragParsingUserdata",
            AdaptiveEvent::FragParsingData => "hlsFragParsingData",
            AdaptiveEvent::Error => "hlsError",
        }
    }
}

impl std::fmt::Display for AdaptiveEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Events subscribed on the legacy-container (flv.js) player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegacyEvent {
    Error,
    LoadingComplete,
    RecoveredEarlyEof,
    MediaInfo,
    MetadataArrived,
    ScriptDataArrived,
    StatisticsInfo,
}

impl LegacyEvent {
    pub const ALL: [LegacyEvent; 7] = [
        LegacyEvent::Error,
        LegacyEvent::LoadingComplete,
        LegacyEvent::RecoveredEarlyEof,
        LegacyEvent::MediaInfo,
        LegacyEvent::MetadataArrived,
        LegacyEvent::ScriptDataArrived,
        LegacyEvent::StatisticsInfo,
    ];

    /// Wire name used by the player
    pub fn name(&self) -> &'static str {
        match self {
            LegacyEvent::Error => "error",
            LegacyEvent::LoadingComplete => "loading_complete",
            LegacyEvent::RecoveredEarlyEof => "recovered_early_eof",
            LegacyEvent::MediaInfo => "media_info",
            LegacyEvent::MetadataArrived => "metadata_arrived",
            LegacyEvent::ScriptDataArrived => "scriptdata_arrived",
            LegacyEvent::StatisticsInfo => "statistics_info",
        }
    }
}

impl std::fmt::Display for LegacyEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A legacy-container event together with its arguments
#[derive(Debug, Clone, PartialEq)]
pub enum LegacySignal {
    Error {
        error_type: String,
        error_detail: String,
        error_info: Value,
    },
    LoadingComplete,
    RecoveredEarlyEof,
    MediaInfo(Value),
    MetadataArrived(Value),
    ScriptDataArrived(Option<Value>),
    StatisticsInfo(Value),
}

impl LegacySignal {
    pub fn kind(&self) -> LegacyEvent {
        match self {
            LegacySignal::Error { .. } => LegacyEvent::Error,
            LegacySignal::LoadingComplete => LegacyEvent::LoadingComplete,
            LegacySignal::RecoveredEarlyEof => LegacyEvent::RecoveredEarlyEof,
            LegacySignal::MediaInfo(_) => LegacyEvent::MediaInfo,
            LegacySignal::MetadataArrived(_) => LegacyEvent::MetadataArrived,
            LegacySignal::ScriptDataArrived(_) => LegacyEvent::ScriptDataArrived,
            LegacySignal::StatisticsInfo(_) => LegacyEvent::StatisticsInfo,
        }
    }
}

/// Lifecycle events of the media element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaEvent {
    LoadedMetadata,
    DurationChange,
    CanPlay,
    Play,
    Pause,
    TimeUpdate,
    Waiting,
    Stalled,
    Ended,
    Error,
}

impl MediaEvent {
    pub const ALL: [MediaEvent; 10] = [
        MediaEvent::LoadedMetadata,
        MediaEvent::DurationChange,
        MediaEvent::CanPlay,
        MediaEvent::Play,
        MediaEvent::Pause,
        MediaEvent::TimeUpdate,
        MediaEvent::Waiting,
        MediaEvent::Stalled,
        MediaEvent::Ended,
        MediaEvent::Error,
    ];

    /// DOM event type
    pub fn name(&self) -> &'static str {
        match self {
            MediaEvent::LoadedMetadata => "loadedmetadata",
            MediaEvent::DurationChange => "durationchange",
            MediaEvent::CanPlay => "canplay",
            MediaEvent::Play => "play",
            MediaEvent::Pause => "pause",
            MediaEvent::TimeUpdate => "timeupdate",
            MediaEvent::Waiting => "waiting",
            MediaEvent::Stalled => "stalled",
            MediaEvent::Ended => "ended",
            MediaEvent::Error => "error",
        }
    }
}

impl std::fmt::Display for MediaEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Anything a collaborator can report
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Adaptive { event: AdaptiveEvent, payload: Value },
    Legacy(LegacySignal),
    Media(MediaEvent),
    /// The runtime refused a play request
    PlayRejected { reason: String },
    TrackAdded(TrackId),
    TrackRemoved(TrackId),
    CueChange(TrackId),
}

/// Who published an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Bound to one playback session; dropped once that session ends
    Session(SessionId),
    /// The media element itself, valid for the manager's whole lifetime
    Element,
}

/// A signal tagged with its origin
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub origin: Origin,
    pub signal: Signal,
}

/// Cloneable publishing handle handed to collaborators
#[derive(Debug, Clone)]
pub struct Notifier {
    origin: Origin,
    tx: mpsc::UnboundedSender<Envelope>,
}

impl Notifier {
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Publish a signal. Silently dropped if the inbox is gone.
    pub fn send(&self, signal: Signal) {
        let _ = self.tx.send(Envelope {
            origin: self.origin,
            signal,
        });
    }
}

/// Producer side of the event channel, owned by the lifecycle manager
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl EventSender {
    /// Notifier publishing with the given origin
    pub fn notifier(&self, origin: Origin) -> Notifier {
        Notifier {
            origin,
            tx: self.tx.clone(),
        }
    }
}

/// Consumer side of the event channel
#[derive(Debug)]
pub struct Inbox {
    rx: mpsc::UnboundedReceiver<Envelope>,
}

impl Inbox {
    /// Next queued envelope, without waiting
    pub fn try_next(&mut self) -> Option<Envelope> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next envelope; `None` once every sender is gone
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }
}

/// Create the inbound event channel
pub fn channel() -> (EventSender, Inbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, Inbox { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        assert_eq!(AdaptiveEvent::ManifestParsed.name(), "hlsManifestParsed");
        assert_eq!(AdaptiveEvent::Error.to_string(), "hlsError");
        assert_eq!(LegacyEvent::ScriptDataArrived.name(), "scriptdata_arrived");
        assert_eq!(MediaEvent::LoadedMetadata.name(), "loadedmetadata");
    }

    #[test]
    fn test_forwarded_set_excludes_control_events() {
        assert!(!AdaptiveEvent::FORWARDED.contains(&AdaptiveEvent::ManifestParsed));
        assert!(!AdaptiveEvent::FORWARDED.contains(&AdaptiveEvent::Error));
    }

    #[test]
    fn test_legacy_signal_kind() {
        let signal = LegacySignal::ScriptDataArrived(None);
        assert_eq!(signal.kind(), LegacyEvent::ScriptDataArrived);
    }

    #[test]
    fn test_envelopes_keep_emission_order() {
        let (sender, mut inbox) = channel();
        let session = SessionId::new();
        let engine = sender.notifier(Origin::Session(session));
        let element = sender.notifier(Origin::Element);

        engine.send(Signal::Media(MediaEvent::Play));
        element.send(Signal::Media(MediaEvent::Pause));
        engine.send(Signal::Media(MediaEvent::Ended));

        let order: Vec<_> = std::iter::from_fn(|| inbox.try_next())
            .map(|env| (env.origin, env.signal))
            .collect();
        assert_eq!(
            order,
            vec![
                (Origin::Session(session), Signal::Media(MediaEvent::Play)),
                (Origin::Element, Signal::Media(MediaEvent::Pause)),
                (Origin::Session(session), Signal::Media(MediaEvent::Ended)),
            ]
        );
    }

    #[tokio::test]
    async fn test_recv_closes_with_senders() {
        let (sender, mut inbox) = channel();
        sender
            .notifier(Origin::Element)
            .send(Signal::TrackAdded(TrackId(1)));
        drop(sender);

        assert!(inbox.recv().await.is_some());
        assert!(inbox.recv().await.is_none());
    }
}

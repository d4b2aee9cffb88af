use crate::{
    Error,
    Result,
    gm::GmVerifier,
    protocol::{
        ClientEvent,
        DICE_RESULT,
        RollRequest,
        ServerEvent,
    },
    sequencer::RevealTimings,
    session::{
        Session,
        SessionConfig,
    },
    theme::Theme,
};
use rand::{
    SeedableRng,
    rngs::StdRng,
};
use serde_json::Value;
use std::time::{
    Duration,
    Instant,
};
use tokio::sync::mpsc;

/// Accepts exactly one password.
pub struct FakeVerifier {
    password: String,
}

impl FakeVerifier {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
        }
    }
}

impl GmVerifier for FakeVerifier {
    async fn verify(&self, password: &str) -> Result<bool> {
        Ok(password == self.password)
    }
}

/// Behaves like an unreachable verification endpoint.
pub struct UnreachableVerifier;

impl GmVerifier for UnreachableVerifier {
    async fn verify(&self, _password: &str) -> Result<bool> {
        Err(Error::ConnectionClosed)
    }
}

/// A session wired to an in-memory outbox, with a fixed clock origin and a
/// seeded rng.
pub struct TestContext {
    session: Session<mpsc::UnboundedSender<ClientEvent>, StdRng>,
    outbox: mpsc::UnboundedReceiver<ClientEvent>,
    start: Instant,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_character("Aria", Theme::Dnd)
    }

    pub fn with_character(character: &str, theme: Theme) -> Self {
        let (publisher, outbox) = mpsc::unbounded_channel();
        let session = Session::with_rng(
            publisher,
            StdRng::seed_from_u64(42),
            SessionConfig {
                character: character.to_string(),
                theme,
                timings: RevealTimings::default(),
            },
        );
        Self {
            session,
            outbox,
            start: Instant::now(),
        }
    }

    pub fn session(&self) -> &Session<mpsc::UnboundedSender<ClientEvent>, StdRng> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<mpsc::UnboundedSender<ClientEvent>, StdRng> {
        &mut self.session
    }

    /// The instant `ms` milliseconds after the context was created.
    pub fn at(&self, ms: u64) -> Instant {
        self.start + Duration::from_millis(ms)
    }

    /// Runs every timeline task due by `ms`.
    pub fn advance_to(&mut self, ms: u64) -> usize {
        let now = self.at(ms);
        self.session.advance(now)
    }

    /// Drains everything the session published so far.
    pub fn sent(&mut self) -> Vec<ClientEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.outbox.try_recv() {
            events.push(event);
        }
        events
    }

    /// The most recent `roll_dice` payload, discarding other events.
    pub fn last_request(&mut self) -> RollRequest {
        self.sent()
            .into_iter()
            .rev()
            .find_map(|event| match event {
                ClientEvent::RollDice(request) => Some(request),
                _ => None,
            })
            .expect("no roll_dice was published")
    }

    /// Feeds a server event decoded from JSON, as the transport would.
    pub fn deliver(&mut self, name: &str, payload: Value, ms: u64) {
        let event = ServerEvent::decode(name, Some(payload)).expect("decodable event");
        let now = self.at(ms);
        self.session.handle_server_event(event, now);
    }

    pub fn deliver_result(&mut self, payload: Value, ms: u64) {
        self.deliver(DICE_RESULT, payload, ms);
    }

    /// Labels currently shown in the tray, in slot order.
    pub fn tray_labels(&self) -> Vec<String> {
        self.session
            .tray()
            .faces()
            .iter()
            .map(|face| face.label.clone())
            .collect()
    }

    pub fn history_headlines(&self) -> Vec<String> {
        self.session
            .history()
            .entries()
            .map(|entry| entry.headline.clone())
            .collect()
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

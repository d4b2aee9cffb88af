//! One client session: everything a connected dice page owns.
use crate::{
    Error,
    Result,
    dice::DieKind,
    dispatcher::{
        RollOrder,
        RollRequestDispatcher,
    },
    gm::{
        GateOutcome,
        GmSessionGate,
        GmVerifier,
    },
    history::HistoryView,
    protocol::{
        ClientEvent,
        RollId,
        ServerEvent,
    },
    registry::PendingRollRegistry,
    sequencer::{
        ResultRevealSequencer,
        RevealTimings,
    },
    theme::{
        Preset,
        Theme,
    },
    transport::{
        Publisher,
        TransportEvent,
    },
    tray::DiceTray,
};
use rand::{
    Rng,
    SeedableRng,
    rngs::StdRng,
};
use std::time::Instant;
use tracing::{
    debug,
    info,
    warn,
};

#[derive(Clone, Debug, Default)]
pub struct SessionConfig {
    pub character: String,
    pub theme: Theme,
    pub timings: RevealTimings,
}

pub struct Session<P, R = StdRng> {
    publisher: P,
    rng: R,
    tray: DiceTray,
    registry: PendingRollRegistry,
    history: HistoryView,
    gate: GmSessionGate,
    sequencer: ResultRevealSequencer,
    dispatcher: RollRequestDispatcher,
    theme: Theme,
    character: String,
    connected: bool,
    status: String,
}

impl<P: Publisher> Session<P, StdRng> {
    pub fn new(publisher: P, config: SessionConfig) -> Self {
        Self::with_rng(publisher, StdRng::from_os_rng(), config)
    }
}

impl<P: Publisher, R: Rng> Session<P, R> {
    pub fn with_rng(publisher: P, rng: R, config: SessionConfig) -> Self {
        Self {
            publisher,
            rng,
            tray: DiceTray::new(),
            registry: PendingRollRegistry::new(),
            history: HistoryView::new(),
            gate: GmSessionGate::new(),
            sequencer: ResultRevealSequencer::new(config.timings),
            dispatcher: RollRequestDispatcher::new(config.timings.frames),
            theme: config.theme,
            character: config.character,
            connected: false,
            status: String::from("Connecting..."),
        }
    }

    /// Called once the realtime namespace is up: pulls the history snapshot.
    pub fn on_connect(&mut self) -> Result<()> {
        self.connected = true;
        self.status = String::from("Connected");
        self.publisher.publish(ClientEvent::RequestHistory {
            is_gm: self.gate.is_active(),
        })
    }

    pub fn roll(&mut self, order: &RollOrder, now: Instant) -> Result<RollId> {
        if order.is_gm_roll && !self.gate.is_active() {
            return Err(Error::GmModeRequired);
        }
        let roll_id = self.dispatcher.dispatch(
            order,
            &self.character,
            self.theme,
            &mut self.tray,
            &mut self.registry,
            &mut self.rng,
            &self.publisher,
        )?;
        self.sequencer.on_dispatched(roll_id.clone(), now);
        self.status = format!("Rolling {}...", describe(order));
        Ok(roll_id)
    }

    pub fn roll_preset(&mut self, preset: &Preset, now: Instant) -> Result<RollId> {
        let order = RollOrder::new(preset.die, preset.count).labelled(preset.label);
        self.roll(&order, now)
    }

    pub fn roll_gm(&mut self, die: DieKind, is_hidden: bool, now: Instant) -> Result<RollId> {
        self.roll(&RollOrder::game_master(die, is_hidden), now)
    }

    pub fn handle_transport_event(&mut self, event: TransportEvent, now: Instant) -> Result<()> {
        match event {
            TransportEvent::Connected => self.on_connect()?,
            TransportEvent::Server(event) => self.handle_server_event(event, now),
            TransportEvent::Disconnected(reason) => {
                self.connected = false;
                self.status = match reason {
                    Some(reason) => format!("Disconnected: {reason}"),
                    None => String::from("Disconnected"),
                };
                warn!(status = %self.status, "realtime connection lost");
            }
        }
        Ok(())
    }

    pub fn handle_server_event(&mut self, event: ServerEvent, now: Instant) {
        let gm_active = self.gate.is_active();
        match event {
            ServerEvent::DiceResult(result) => {
                let disposition = self.sequencer.on_result(
                    result,
                    now,
                    &mut self.registry,
                    &mut self.history,
                    gm_active,
                );
                debug!(?disposition, "dice result handled");
            }
            ServerEvent::RollHistory(results) => {
                info!(entries = results.len(), "history snapshot received");
                self.history.render(&results, false, gm_active);
            }
            ServerEvent::DiceError(error) => {
                self.sequencer.on_error(&error, &mut self.registry);
                self.status = format!("Roll failed: {}", error.message);
            }
            ServerEvent::GmStatus(status) => {
                info!(%status, "gm status");
            }
            ServerEvent::Unknown(name) => {
                debug!(event = %name, "ignoring unknown server event");
            }
        }
    }

    /// Runs all timeline work due at `now`.
    pub fn advance(&mut self, now: Instant) -> usize {
        let gm_active = self.gate.is_active();
        self.sequencer.advance(
            now,
            &mut self.tray,
            &mut self.registry,
            &mut self.history,
            &mut self.rng,
            gm_active,
        )
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.sequencer.next_deadline()
    }

    pub fn open_gm_prompt(&mut self) {
        self.gate.open_prompt();
    }

    pub fn close_gm_prompt(&mut self) {
        self.gate.close_prompt();
    }

    pub async fn enter_gm<V>(&mut self, verifier: &V, password: &str) -> Result<bool>
    where
        V: GmVerifier + ?Sized,
    {
        match self.gate.enter(verifier, password).await {
            GateOutcome::Granted(events) => {
                for event in events {
                    self.publisher.publish(event)?;
                }
                self.status = String::from("GM mode");
                Ok(true)
            }
            GateOutcome::Denied => {
                self.status = String::from("Incorrect GM password");
                Ok(false)
            }
        }
    }

    pub fn exit_gm(&mut self) -> Result<()> {
        for event in self.gate.exit() {
            self.publisher.publish(event)?;
        }
        self.status = String::from("Player mode");
        Ok(())
    }

    /// Asks the server to wipe the history this session can see.
    pub fn clear_history(&mut self) -> Result<()> {
        let is_gm = self.gate.is_active();
        info!(is_gm, "clearing history");
        self.publisher.publish(ClientEvent::ClearHistory { is_gm })
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }

    pub fn set_character(&mut self, character: impl Into<String>) {
        self.character = character.into();
    }

    pub fn tray(&self) -> &DiceTray {
        &self.tray
    }

    pub fn history(&self) -> &HistoryView {
        &self.history
    }

    pub fn registry(&self) -> &PendingRollRegistry {
        &self.registry
    }

    pub fn gate(&self) -> &GmSessionGate {
        &self.gate
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn character(&self) -> &str {
        &self.character
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

fn describe(order: &RollOrder) -> String {
    match &order.label {
        Some(label) => label.clone(),
        None if order.count > 1 => format!("{}{}", order.count, order.die),
        None => order.die.to_string(),
    }
}

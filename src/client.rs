use crate::ui;
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use crossterm::event::EventStream;
use dice_chamber::{
    dispatcher::RollOrder,
    gm::HttpGmVerifier,
    protocol::ClientEvent,
    sequencer::RevealTimings,
    session::{
        Session,
        SessionConfig,
    },
    settings::{
        Settings,
        SettingsStore,
    },
    theme::Theme,
    transport::{
        self,
        Connection,
    },
};
use std::time::{
    Duration,
    Instant,
};
use tokio::{
    sync::mpsc::UnboundedSender,
    time,
};
use tracing::{
    error,
    info,
    warn,
};
use url::Url;

type AppSession = Session<UnboundedSender<ClientEvent>>;

/// Everything the binary resolved from the command line and settings file.
pub struct AppConfig {
    pub server: Url,
    pub character: String,
    pub theme: Theme,
    pub settings: SettingsStore,
    pub gm_password: Option<String>,
    pub timings: RevealTimings,
}

struct App {
    session: AppSession,
    connection: Connection,
    verifier: HttpGmVerifier,
    settings: SettingsStore,
    connection_open: bool,
}

impl App {
    fn persist_settings(&self) {
        let settings = Settings {
            character_name: self.session.character().to_string(),
            theme: self.session.theme(),
        };
        if let Err(err) = self.settings.save(&settings) {
            warn!(error = %err, path = %self.settings.path().display(), "failed to save settings");
        }
    }
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let connection = transport::connect(&config.server)
        .await
        .wrap_err_with(|| format!("Failed to connect to {}", config.server))?;
    let verifier = HttpGmVerifier::new(&config.server)?;
    let session = Session::new(
        connection.publisher(),
        SessionConfig {
            character: config.character,
            theme: config.theme,
            timings: config.timings,
        },
    );
    let mut app = App {
        session,
        connection,
        verifier,
        settings: config.settings,
        connection_open: true,
    };
    let mut ui_state = ui::UiState::default();

    if let Some(password) = config.gm_password {
        if app.session.enter_gm(&app.verifier, &password).await? {
            ui_state.gm_entered();
        } else {
            ui_state.set_error("Incorrect GM password");
        }
    }

    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(&mut app, &mut ui_state).await;
    ui::terminal_exit()?;
    res
}

async fn run_loop(app: &mut App, ui_state: &mut ui::UiState) -> Result<()> {
    let mut input = EventStream::new();
    ui::draw(ui_state, &app.session)?;
    loop {
        let deadline = app.session.next_deadline();
        let wake = deadline
            .map(time::Instant::from_std)
            .unwrap_or_else(|| time::Instant::now() + Duration::from_secs(3600));
        tokio::select! {
            _ = time::sleep_until(wake), if deadline.is_some() => {
                app.session.advance(Instant::now());
            }
            ev = app.connection.recv(), if app.connection_open => {
                match ev {
                    Some(ev) => {
                        if let Err(err) = app.session.handle_transport_event(ev, Instant::now()) {
                            error!(error = %err, "failed to handle transport event");
                            ui_state.set_error(err.to_string());
                        }
                    }
                    None => {
                        warn!("transport task exited");
                        app.connection_open = false;
                    }
                }
            }
            ev = ui::next_event(ui_state, &mut input) => {
                if !handle_user_event(app, ui_state, ev?).await {
                    break;
                }
            }
        }
        ui::draw(ui_state, &app.session)?;
    }
    info!("leaving dice chamber");
    Ok(())
}

/// Returns `false` when the user asked to quit.
async fn handle_user_event(app: &mut App, ui_state: &mut ui::UiState, ev: ui::UserEvent) -> bool {
    let now = Instant::now();
    let outcome = match ev {
        ui::UserEvent::Quit => return false,
        ui::UserEvent::Redraw => return true,
        ui::UserEvent::Roll { die, count } => {
            app.session.roll(&RollOrder::new(die, count), now).map(drop)
        }
        ui::UserEvent::RollPreset(index) => {
            match app.session.theme().presets().get(index) {
                Some(preset) => app.session.roll_preset(preset, now).map(drop),
                None => return true,
            }
        }
        ui::UserEvent::RollGm { die, hidden } => app.session.roll_gm(die, hidden, now).map(drop),
        ui::UserEvent::OpenGmPrompt => {
            app.session.open_gm_prompt();
            Ok(())
        }
        ui::UserEvent::CancelGmPrompt => {
            app.session.close_gm_prompt();
            Ok(())
        }
        ui::UserEvent::SubmitGmPassword(password) => {
            match app.session.enter_gm(&app.verifier, &password).await {
                Ok(true) => {
                    ui_state.gm_entered();
                    Ok(())
                }
                Ok(false) => {
                    ui_state.gm_rejected();
                    Ok(())
                }
                Err(err) => Err(err),
            }
        }
        ui::UserEvent::ExitGm => {
            ui_state.gm_exited();
            app.session.exit_gm()
        }
        ui::UserEvent::ClearHistory => app.session.clear_history(),
        ui::UserEvent::ToggleTheme => {
            let theme = app.session.toggle_theme();
            info!(%theme, "theme changed");
            app.persist_settings();
            Ok(())
        }
        ui::UserEvent::SetName(name) => {
            app.session.set_character(name.trim());
            app.persist_settings();
            Ok(())
        }
    };
    match outcome {
        Ok(()) => ui_state.clear_error(),
        Err(err) => {
            error!(error = %err, "action failed");
            ui_state.set_error(err.to_string());
        }
    }
    true
}

use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use dice_chamber::{
    sequencer::RevealTimings,
    settings::SettingsStore,
    theme::Theme,
};
use std::{
    path::PathBuf,
    sync::OnceLock,
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};
use url::Url;

mod client;
mod ui;

const SERVER_ENV: &str = "DICE_CHAMBER_SERVER";
const DEFAULT_SERVER: &str = "http://localhost:5000";
const DEFAULT_LOG_DIR: &str = "~/.dice-chamber/logs";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const USAGE: &str = "\
Usage: dice-chamber [OPTIONS]

Options:
  --server <url>       Dice server (default: $DICE_CHAMBER_SERVER or http://localhost:5000)
  --name <character>   Character name sent with rolls
  --theme <theme>      dnd | warhammer
  --settings <path>    Settings file (default: ~/.dice-chamber/settings.json)
  --log-dir <path>     Directory for daily log files (default: ~/.dice-chamber/logs)
  --gm                 Prompt for the Game Master password before starting
  --help               Print this help";

#[derive(Debug, Default, PartialEq)]
struct Args {
    server: Option<String>,
    name: Option<String>,
    theme: Option<Theme>,
    settings: Option<String>,
    log_dir: Option<String>,
    gm: bool,
    help: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .ok_or_else(|| eyre!("missing value for {flag}"))
        };
        match arg.as_str() {
            "--server" => parsed.server = Some(value("--server")?),
            "--name" => parsed.name = Some(value("--name")?),
            "--theme" => parsed.theme = Some(value("--theme")?.parse()?),
            "--settings" => parsed.settings = Some(value("--settings")?),
            "--log-dir" => parsed.log_dir = Some(value("--log-dir")?),
            "--gm" => parsed.gm = true,
            "--help" | "-h" => parsed.help = true,
            other => return Err(eyre!("unknown argument: {other}\n\n{USAGE}")),
        }
    }
    Ok(parsed)
}

fn init_tracing(log_dir: &str) -> Result<()> {
    let dir = PathBuf::from(
        shellexpand::full(log_dir)
            .wrap_err_with(|| format!("Failed to expand log directory {log_dir}"))?
            .into_owned(),
    );
    std::fs::create_dir_all(&dir)
        .wrap_err_with(|| format!("Failed to create log directory {}", dir.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&dir, "dice-chamber.log"));
    let _ = LOG_GUARD.set(guard);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = parse_args(std::env::args().skip(1))?;
    if args.help {
        println!("{USAGE}");
        return Ok(());
    }
    init_tracing(args.log_dir.as_deref().unwrap_or(DEFAULT_LOG_DIR))?;

    let store = match args.settings.as_deref() {
        Some(path) => SettingsStore::expanded(path)?,
        None => SettingsStore::default_location()?,
    };
    let saved = store.load()?;
    let server = args
        .server
        .or_else(|| std::env::var(SERVER_ENV).ok())
        .unwrap_or_else(|| DEFAULT_SERVER.to_string());
    let server = Url::parse(&server).wrap_err_with(|| format!("Invalid server URL {server}"))?;

    let gm_password = if args.gm {
        Some(rpassword::prompt_password("Game Master password: ").wrap_err("Failed to read password")?)
    } else {
        None
    };

    tracing::info!(%server, settings = %store.path().display(), "starting dice chamber");
    client::run_app(client::AppConfig {
        server,
        character: args.name.unwrap_or(saved.character_name),
        theme: args.theme.unwrap_or(saved.theme),
        settings: store,
        gm_password,
        timings: RevealTimings::default(),
    })
    .await
}

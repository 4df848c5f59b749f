//! `safealert` - CLI for the safealert toolkit
//!
//! This binary manages trusted contacts and runs the panic, siren, fake-call
//! and feature actions from the terminal.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use chrono::Local;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use safealert::cli::{
    AlertCommand, Cli, Command, ComposeCommand, ConfigCommand, ContactsCommand, OutputFormat,
    PanicCommand, SirenCommand,
};
use safealert::location::{provider_from_config, FixedLocationProvider};
use safealert::{
    compose_message, init_logging, platform, AlertDispatcher, AudioPlayer, Clip, Config, Contact,
    ContactStore, Coordinate, FakeCall, Focus, LocationProvider, PanicRequest, PanicSequence,
    PanicSettings, PrintLauncher, Provider, ShareRegistry, SilentAudioPlayer, SqliteBackend,
    StatusLine, SystemAudioPlayer, SystemLauncher, UriLauncher,
};

/// Everything the commands share.
struct App {
    config: Config,
    contacts: Arc<ContactStore<SqliteBackend>>,
    audio: Arc<dyn AudioPlayer>,
    status: StatusLine,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("contacts", &self.contacts)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl App {
    fn open(config: Config) -> anyhow::Result<Self> {
        let backend = SqliteBackend::open(config.database_path())
            .with_context(|| format!("opening {}", config.database_path().display()))?;
        let contacts = Arc::new(ContactStore::new(backend, config.storage.contacts_key.clone()));
        let audio: Arc<dyn AudioPlayer> = if config.alert.sound_enabled {
            Arc::new(SystemAudioPlayer::from_config(&config))
        } else {
            Arc::new(SilentAudioPlayer::new())
        };
        let status = StatusLine::new(config.status_clear_after());
        Ok(Self {
            config,
            contacts,
            audio,
            status,
        })
    }

    fn location(&self) -> Option<Arc<dyn LocationProvider>> {
        provider_from_config(&self.config).map(Arc::<dyn LocationProvider>::from)
    }

    fn panic_sequence(
        &self,
        location: Option<Arc<dyn LocationProvider>>,
        launcher: Arc<dyn UriLauncher>,
    ) -> PanicSequence<SqliteBackend> {
        PanicSequence::new(
            Arc::clone(&self.contacts),
            location,
            launcher,
            Arc::clone(&self.audio),
            self.status.clone(),
            PanicSettings::from_config(&self.config),
        )
    }

    fn dispatcher(&self) -> AlertDispatcher {
        AlertDispatcher::new(
            Arc::clone(&self.audio),
            self.location(),
            self.config.location_options(),
            self.status.clone(),
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Config commands must work even when the config is broken
    let command = match cli.command {
        Command::Config(cmd) => return handle_config(cli.config, cmd),
        other => other,
    };

    let config = Config::load_from(cli.config).context("loading configuration")?;
    platform::init()?;
    debug!("Running on {}", platform::platform_name());

    let app = App::open(config)?;

    match command {
        Command::Contacts(cmd) => handle_contacts(&app, cmd),
        Command::Panic(cmd) => handle_panic(&app, cmd).await,
        Command::Compose(cmd) => handle_compose(&app, &cmd),
        Command::Alert(cmd) => handle_alert(&app, &cmd).await,
        Command::Siren(cmd) => handle_siren(&app, &cmd).await,
        Command::FakeCall => handle_fake_call(&app).await,
        Command::Console => handle_console(&app).await,
        Command::Config(_) => Ok(()),
    }
}

fn handle_contacts(app: &App, cmd: ContactsCommand) -> anyhow::Result<()> {
    match cmd {
        ContactsCommand::List { strict, format } => {
            let contacts = if strict {
                app.contacts.try_list()?
            } else {
                app.contacts.list()
            };
            print_contacts(&contacts, format)?;
        }
        ContactsCommand::Add { name, phone, email } => {
            let contact = Contact::new(&name, phone.as_deref(), email.as_deref())
                .map_err(|e| anyhow!(e.user_message()))?;
            app.contacts.add(contact.clone())?;
            println!("Added {contact}");
        }
        ContactsCommand::Remove { index } => match app.contacts.remove(index)? {
            Some(removed) => println!("Removed {removed}"),
            None => println!("No contact at position {index}."),
        },
        ContactsCommand::Clear { yes } => {
            if yes {
                app.contacts.clear()?;
                println!("All contacts removed.");
            } else {
                println!("This will remove every trusted contact.");
                println!("Use --yes to confirm.");
            }
        }
    }
    Ok(())
}

fn print_contacts(contacts: &[Contact], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(contacts)?),
        OutputFormat::Plain => {
            for (index, contact) in contacts.iter().enumerate() {
                println!("{index}: {contact}");
            }
        }
        OutputFormat::Table => {
            if contacts.is_empty() {
                println!("No trusted contacts yet. Add one with `safealert contacts add`.");
                return Ok(());
            }
            println!("{:<4} {:<24} {:<18} EMAIL", "#", "NAME", "PHONE");
            for (index, contact) in contacts.iter().enumerate() {
                println!(
                    "{:<4} {:<24} {:<18} {}",
                    index,
                    contact.name,
                    contact.phone.as_deref().unwrap_or("-"),
                    contact.email.as_deref().unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}

async fn handle_panic(app: &App, cmd: PanicCommand) -> anyhow::Result<()> {
    let location = match (cmd.lat, cmd.lon) {
        (Some(lat), Some(lon)) => {
            let coordinate = Coordinate::new(lat, lon)
                .ok_or_else(|| anyhow!("coordinates ({lat}, {lon}) are out of range"))?;
            Some(Arc::new(FixedLocationProvider::new(coordinate)) as Arc<dyn LocationProvider>)
        }
        _ => app.location(),
    };
    let launcher: Arc<dyn UriLauncher> = if cmd.dry_run {
        Arc::new(PrintLauncher)
    } else {
        Arc::new(SystemLauncher)
    };
    let provider = cmd
        .via
        .map_or(app.config.share.default_provider, Provider::from);

    let sequence = app.panic_sequence(location, launcher);
    let request = PanicRequest {
        provider,
        contact_index: cmd.to,
    };

    match sequence.run(request).await {
        Ok(outcome) => {
            if let Some(status) = app.status.current() {
                eprintln!("{}", status.text);
            }
            if let Some(contact) = &outcome.contact {
                debug!("Addressed to {contact}");
            }
            if !cmd.no_wait && app.audio.is_playing(Clip::Siren) {
                eprintln!(
                    "Siren on for {}s. Press Ctrl-C to stop it.",
                    app.config.alert.siren_seconds
                );
                tokio::select! {
                    () = sequence.siren_finished() => {}
                    _ = tokio::signal::ctrl_c() => app.audio.stop(Clip::Siren),
                }
            }
            Ok(())
        }
        Err(e) => {
            if e.is_location_error() {
                eprintln!("{}", platform::location_help());
            }
            let message = e.user_message();
            Err(anyhow::Error::new(e).context(message))
        }
    }
}

fn handle_compose(app: &App, cmd: &ComposeCommand) -> anyhow::Result<()> {
    let coordinate = Coordinate::new(cmd.lat, cmd.lon)
        .ok_or_else(|| anyhow!("coordinates ({}, {}) are out of range", cmd.lat, cmd.lon))?;
    let sender = cmd
        .from
        .as_deref()
        .unwrap_or(&app.config.share.sender_label);
    let message = compose_message(coordinate, sender, &Local::now());
    println!("{message}");

    if let Some(via) = cmd.via {
        let contact = match cmd.to {
            Some(index) => Some(
                app.contacts
                    .get(index)
                    .ok_or(safealert::Error::UnknownContact(index))?,
            ),
            None => None,
        };
        let share = ShareRegistry::default().compose(
            via.into(),
            &message,
            &app.config.share.subject,
            contact.as_ref(),
        )?;
        println!();
        println!("{}", share.uri);
    }
    Ok(())
}

async fn handle_alert(app: &App, cmd: &AlertCommand) -> anyhow::Result<()> {
    let dispatcher = app.dispatcher();
    match dispatcher.dispatch_label(&cmd.label).await {
        Ok(text) => {
            println!("{text}");
            if app.audio.is_playing(Clip::Siren) {
                wait_for_clip(app, Clip::Siren).await;
            }
            Ok(())
        }
        Err(e) => {
            let message = e.user_message();
            Err(anyhow::Error::new(e).context(message))
        }
    }
}

async fn handle_siren(app: &App, cmd: &SirenCommand) -> anyhow::Result<()> {
    let seconds = cmd.seconds.unwrap_or(app.config.alert.siren_seconds);
    if seconds == 0 {
        bail!("siren duration must be greater than 0");
    }
    app.audio.play(Clip::Siren, true)?;
    eprintln!("Siren on for {seconds}s. Press Ctrl-C to stop it.");
    tokio::select! {
        () = tokio::time::sleep(Duration::from_secs(seconds)) => {}
        _ = tokio::signal::ctrl_c() => {}
    }
    app.audio.stop(Clip::Siren);
    Ok(())
}

async fn handle_fake_call(app: &App) -> anyhow::Result<()> {
    let call = FakeCall::new(Arc::clone(&app.audio));
    call.press();
    eprintln!("Ringing. Press Enter to [{}].", call.label());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    tokio::select! {
        line = lines.next_line() => { line?; }
        _ = tokio::signal::ctrl_c() => {}
    }
    call.press();
    Ok(())
}

/// Poll until `clip` stops or Ctrl-C.
async fn wait_for_clip(app: &App, clip: Clip) {
    let poll = async {
        while app.audio.is_playing(clip) {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    };
    tokio::select! {
        () = poll => {}
        _ = tokio::signal::ctrl_c() => app.audio.stop(clip),
    }
}

const CONSOLE_HELP: &str = "\
Commands:
  <panic key>            share your location with the default provider
  panic [PROVIDER] [N]   share via email, sms or whatsapp, optionally to contact N
  call                   start or stop the fake call
  siren | stop           sound the siren, or silence everything
  alert LABEL            run a feature card, e.g. alert Nearby Safe Zones
  contacts               list trusted contacts
  help                   show this help
  quit                   leave";

async fn handle_console(app: &App) -> anyhow::Result<()> {
    let shortcut = app.config.panic_shortcut();
    let sequence = Arc::new(app.panic_sequence(app.location(), Arc::new(SystemLauncher)));
    let dispatcher = app.dispatcher();
    let call = FakeCall::new(Arc::clone(&app.audio));

    let mut updates = app.status.subscribe();
    let printer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            if let Some(status) = updates.borrow_and_update().as_ref() {
                println!("{status}");
            }
        }
    });

    println!(
        "safealert console on {}. Press '{shortcut}' then Enter to panic, 'help' for more.",
        platform::platform_name()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let mut chars = line.chars();
        if let (Some(key), None) = (chars.next(), chars.next()) {
            if shortcut.triggers(key, Focus::Page) {
                let request = PanicRequest::broadcast(app.config.share.default_provider);
                spawn_panic(&sequence, request);
                continue;
            }
        }

        let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
        match word {
            "" => {}
            "panic" => match parse_panic_args(rest, app.config.share.default_provider) {
                Ok(request) => spawn_panic(&sequence, request),
                Err(e) => println!("{e}"),
            },
            "call" => {
                call.press();
                println!("[{}]", call.label());
            }
            "siren" => {
                if let Err(e) = app.audio.play(Clip::Siren, true) {
                    println!("{}", e.user_message());
                }
            }
            "stop" => {
                app.audio.stop(Clip::Siren);
                app.audio.stop(Clip::Ringtone);
            }
            "alert" => {
                if let Err(e) = dispatcher.dispatch_label(rest.trim()).await {
                    println!("{}", e.user_message());
                }
            }
            "contacts" => print_contacts(&app.contacts.list(), OutputFormat::Table)?,
            "help" | "?" => println!("{CONSOLE_HELP}"),
            "quit" | "exit" => break,
            other => println!("Unknown command '{other}'. Type 'help'."),
        }
    }

    app.audio.stop(Clip::Siren);
    app.audio.stop(Clip::Ringtone);
    printer.abort();
    Ok(())
}

fn spawn_panic(sequence: &Arc<PanicSequence<SqliteBackend>>, request: PanicRequest) {
    let sequence = Arc::clone(sequence);
    tokio::spawn(async move {
        match sequence.run(request).await {
            Ok(outcome) => println!("{}", outcome.share.uri),
            Err(e) => warn!("Panic did not complete: {e}"),
        }
    });
}

fn parse_panic_args(args: &str, default: Provider) -> anyhow::Result<PanicRequest> {
    let mut parts = args.split_whitespace();
    let provider = match parts.next() {
        Some(p) => p.parse::<Provider>()?,
        None => default,
    };
    let contact_index = parts
        .next()
        .map(str::parse::<usize>)
        .transpose()
        .context("contact position must be a number")?;
    Ok(PanicRequest {
        provider,
        contact_index,
    })
}

fn handle_config(path: Option<std::path::PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Contacts key:       {}", config.storage.contacts_key);
                println!();
                println!("[Location]");
                println!("  High accuracy:      {}", config.location.high_accuracy);
                println!("  Timeout (ms):       {}", config.location.timeout_ms);
                println!("  Maximum age (ms):   {}", config.location.maximum_age_ms);
                match (&config.location.command, config.fixed_coordinate()) {
                    (Some(command), _) => println!("  Provider:           command `{command}`"),
                    (None, Some(coordinate)) => {
                        println!("  Provider:           fixed ({coordinate})");
                    }
                    (None, None) => println!("  Provider:           none"),
                }
                println!();
                println!("[Alert]");
                println!("  Sound:              {}", config.alert.sound_enabled);
                println!("  Siren (s):          {}", config.alert.siren_seconds);
                println!("  Siren clip:         {}", config.siren_clip().display());
                println!("  Ring tone clip:     {}", config.ringtone_clip().display());
                println!();
                println!("[Share]");
                println!("  Sender label:       {}", config.share.sender_label);
                println!("  Subject:            {}", config.share.subject);
                println!("  Default provider:   {}", config.share.default_provider);
                println!();
                println!("[UI]");
                println!("  Status clear (ms):  {}", config.ui.status_clear_ms);
                println!("  Panic key:          {}", config.panic_shortcut());
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.or(path).unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

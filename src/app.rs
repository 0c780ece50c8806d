//! Headless driver: keeps the orchestrator, the current match state and the
//! settings file in step, one operator command at a time.

use crate::settings::{self, AppSettings};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use courtside_core::client::{SyncOrchestrator, Transport};
use courtside_core::config::{FieldMapping, DEFAULT_PORT};
use courtside_core::{catalog, resolve, FieldKind, MatchState};
use std::path::{Path, PathBuf};

/// One operator command, typed at the prompt or given on the command line.
#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Check the connection
    Status,
    /// Connect to a remote system
    Connect {
        host: String,
        #[arg(default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Stop treating the remote system as connected
    Disconnect,
    /// List remote inputs and heal renamed ones
    Inputs,
    /// List fields of a configured input
    Fields { input: String },
    /// Push match data (all inputs by default)
    Push { input: Option<String> },
    /// Put an overlay on air
    Show { action: String },
    /// Take an overlay off air
    Hide { action: String },
    /// Show when off air, hide when on air
    Toggle { action: String },
    /// Read match state from a JSON file
    Load { file: PathBuf },
    /// List mappable data keys, optionally for one field kind
    Catalog { kind: Option<FieldKind> },
    /// Configure a remote input by title or number
    Add {
        remote: String,
        /// Name shown to the operator (defaults to the remote title)
        display_name: Vec<String>,
    },
    /// Drop a configured input
    Remove { input: String },
    /// Include an input when pushing
    Enable { input: String },
    /// Skip an input when pushing
    Disable { input: String },
    /// Assign an overlay action to an input
    Bind { action: String, input: String },
    /// Map a remote field to a data key
    Map {
        input: String,
        field: String,
        kind: FieldKind,
        key: String,
    },
    /// Map a text field to a literal value
    Set {
        input: String,
        field: String,
        #[arg(required = true)]
        value: Vec<String>,
    },
    /// Remove a field mapping
    Unmap { input: String, field: String },
    /// Leave the prompt
    #[command(alias = "exit")]
    Quit,
}

/// A line typed at the prompt.
#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
struct PromptLine {
    #[command(subcommand)]
    command: Command,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self> {
        let line = PromptLine::try_parse_from(line.split_whitespace())?;
        Ok(line.command)
    }
}

pub struct App<T: Transport> {
    sync: SyncOrchestrator<T>,
    settings: AppSettings,
    settings_path: PathBuf,
    match_state: MatchState,
}

impl<T: Transport> App<T> {
    pub fn new(settings: AppSettings, settings_path: PathBuf, transport: T) -> Self {
        let mut sync = SyncOrchestrator::new(&settings.mirror, transport);
        sync.set_asset_base_url(settings.asset_base_url.clone());
        let mut app = Self {
            sync,
            settings,
            settings_path,
            match_state: MatchState::default(),
        };
        if let Some(path) = app.settings.match_file.clone() {
            if let Err(e) = app.load_match(&path) {
                log::warn!("Failed to load match file {}: {:#}", path.display(), e);
            }
        }
        app
    }

    pub fn sync(&self) -> &SyncOrchestrator<T> {
        &self.sync
    }

    pub fn match_state(&self) -> &MatchState {
        &self.match_state
    }

    fn load_match(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        self.match_state = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(())
    }

    fn persist(&mut self) -> Result<()> {
        self.settings.mirror = self.sync.config_blob();
        settings::save_settings_to(&self.settings, &self.settings_path)
    }

    fn edit<F>(&mut self, edit: F) -> Result<()>
    where
        F: FnOnce(&mut courtside_core::MirrorConfig),
    {
        self.sync.edit_config(edit);
        self.persist()
    }

    fn input_id(&self, key: &str) -> Result<String> {
        resolve::find(self.sync.config(), key)
            .map(|m| m.id.to_string())
            .ok_or_else(|| anyhow!("input {:?} is not configured", key))
    }

    fn set_enabled(&mut self, input: &str, enabled: bool) -> Result<String> {
        let id = self.input_id(input)?;
        self.edit(|config| {
            if let Some(input) = config.inputs.get_mut(&id) {
                input.enabled = enabled;
            }
        })?;
        Ok(format!("{} {}", id, if enabled { "enabled" } else { "disabled" }))
    }

    /// Run one command and return the text to show the operator.
    pub async fn handle(&mut self, command: Command) -> Result<String> {
        match command {
            Command::Status => {
                let state = self.sync.check_connection().await;
                let config = self.sync.config();
                let active = self.sync.overlays().active_actions().join(", ");
                Ok(format!(
                    "{} is {:?}; {} input(s) configured; on air: {}",
                    config.base_url(),
                    state,
                    config.inputs.len(),
                    if active.is_empty() { "nothing" } else { active.as_str() }
                ))
            }
            Command::Inputs => {
                let report = self.sync.refresh_inputs().await?;
                if !report.updated_ids.is_empty() {
                    self.persist()?;
                }
                let mut lines: Vec<String> = report
                    .inputs
                    .iter()
                    .map(|d| format!("{:>3}  {}  ({})", d.number, d.title, d.key))
                    .collect();
                for id in &report.updated_ids {
                    lines.push(format!("remapped {}", id));
                }
                for id in &report.unresolved_ids {
                    lines.push(format!("unresolved {}", id));
                }
                Ok(lines.join("\n"))
            }
            Command::Connect { host, port } => {
                let state = self.sync.connect(&host, port).await;
                self.persist()?;
                Ok(format!("{} is {:?}", self.sync.config().base_url(), state))
            }
            Command::Disconnect => {
                self.sync.disconnect();
                self.persist()?;
                Ok(format!("disconnected from {}", self.sync.config().base_url()))
            }
            Command::Fields { input } => {
                let fields = self.sync.discover_fields(&input).await?;
                let id = self.input_id(&input)?;
                let mapped = &self.sync.config().inputs[&id].fields;
                Ok(fields
                    .iter()
                    .map(|f| {
                        let source = mapped
                            .get(&f.name)
                            .and_then(|m| m.data_map_key.as_deref().or(m.custom_value.as_deref()))
                            .unwrap_or("-");
                        format!("{} [{}] <- {}", f.name, f.kind, source)
                    })
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            Command::Push { input } => {
                let report = match input {
                    Some(input) => self.sync.push_input(&input, &self.match_state).await?,
                    None => self.sync.push_all(&self.match_state).await?,
                };
                let mut out = format!("sent {} command(s)", report.sent);
                for (what, reason) in &report.skipped {
                    out.push_str(&format!("\nskipped {}: {}", what, reason));
                }
                for (what, err) in &report.failed {
                    out.push_str(&format!("\nfailed {}: {}", what, err));
                }
                Ok(out)
            }
            Command::Show { action } => {
                self.sync.show_overlay(&action, &self.match_state).await?;
                Ok(format!("{} on air", action))
            }
            Command::Hide { action } => {
                self.sync.hide_overlay(&action).await?;
                Ok(format!("{} off air", action))
            }
            Command::Toggle { action } => {
                let on_air = self.sync.toggle_overlay(&action, &self.match_state).await?;
                Ok(format!("{} {}", action, if on_air { "on air" } else { "off air" }))
            }
            Command::Load { file: path } => {
                self.load_match(&path)?;
                self.settings.match_file = Some(path.clone());
                self.persist()?;
                let mut out = format!("loaded {}", path.display());
                if self.settings.auto_push {
                    let report = self.sync.push_all(&self.match_state).await?;
                    out.push_str(&format!("; sent {} command(s)", report.sent));
                }
                Ok(out)
            }
            Command::Catalog { kind } => Ok(catalog::lookup(kind)
                .iter()
                .flat_map(|group| {
                    std::iter::once(format!("{}:", group.name)).chain(
                        group
                            .entries
                            .iter()
                            .map(|e| format!("  {:<16} {}", e.key, e.label)),
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")),
            Command::Add { remote, display_name } => {
                let report = self.sync.refresh_inputs().await?;
                let wanted = remote.trim();
                let descriptor = report
                    .inputs
                    .iter()
                    .find(|d| d.title.trim() == wanted || d.number == wanted)
                    .cloned()
                    .ok_or_else(|| anyhow!("no remote input titled or numbered {:?}", wanted))?;
                let name = match display_name.join(" ") {
                    name if name.is_empty() => descriptor.title.clone(),
                    name => name,
                };
                let mut id = String::new();
                self.edit(|config| id = config.add_input(&name, &descriptor))?;
                Ok(format!("added {} as {}", name, id))
            }
            Command::Remove { input } => {
                let id = self.sync.remove_input(&input).await?;
                self.persist()?;
                Ok(format!("removed {}", id))
            }
            Command::Enable { input } => self.set_enabled(&input, true),
            Command::Disable { input } => self.set_enabled(&input, false),
            Command::Bind { action, input } => {
                if self.sync.overlays().action(&action).is_none() {
                    bail!("unknown overlay action {:?}", action);
                }
                let id = self.input_id(&input)?;
                self.edit(|config| config.bind_overlay(&action, &id))?;
                Ok(format!("{} -> {}", action, id))
            }
            Command::Map { input, field, kind, key } => {
                if let Some(entry) = catalog::find(&key) {
                    if !entry.data_type.is_compatible_with(kind) {
                        bail!("{} cannot feed a {} field", key, kind);
                    }
                } else {
                    log::warn!("Mapping {} to unknown data key {}", field, key);
                }
                let id = self.input_id(&input)?;
                self.edit(|config| {
                    config.set_field_mapping(&id, &field, FieldMapping::data(kind, key.as_str()));
                })?;
                Ok(format!("{} <- {}", field, catalog::label_for(&key, kind)))
            }
            Command::Set { input, field, value } => {
                let value = value.join(" ");
                let id = self.input_id(&input)?;
                self.edit(|config| {
                    config.set_field_mapping(&id, &field, FieldMapping::custom(value.as_str()));
                })?;
                Ok(format!("{} <- {:?}", field, value))
            }
            Command::Unmap { input, field } => {
                let id = self.input_id(&input)?;
                self.edit(|config| {
                    config.clear_field_mapping(&id, &field);
                })?;
                Ok(format!("{} unmapped", field))
            }
            Command::Quit => Ok(String::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courtside_core::api::{RemoteCommand, RemoteFieldDescriptor, RemoteInputDescriptor};
    use courtside_core::client::xml::ParsedInput;
    use courtside_core::TransportError;
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeTransport {
        sent: RefCell<Vec<RemoteCommand>>,
        base_url: String,
    }

    impl Transport for FakeTransport {
        async fn send(&self, command: &RemoteCommand) -> Result<(), TransportError> {
            self.sent.borrow_mut().push(command.clone());
            Ok(())
        }

        async fn fetch_state(&self) -> Result<Vec<ParsedInput>, TransportError> {
            Ok(vec![ParsedInput {
                descriptor: RemoteInputDescriptor {
                    key: "key-a".into(),
                    title: "Scoreboard".into(),
                    number: "1".into(),
                },
                fields: vec![RemoteFieldDescriptor {
                    name: "HomeName".into(),
                    kind: FieldKind::Text,
                }],
            }])
        }

        fn set_base_url(&mut self, base_url: &str) {
            self.base_url = base_url.to_string();
        }
    }

    fn make_app(dir: &tempfile::TempDir) -> App<FakeTransport> {
        let path = dir.path().join("settings.json");
        App::new(AppSettings::default(), path, FakeTransport::default())
    }

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("push").unwrap(), Command::Push { input: None });
        assert_eq!(
            Command::parse("map Score HomeName text home.name").unwrap(),
            Command::Map {
                input: "Score".into(),
                field: "HomeName".into(),
                kind: FieldKind::Text,
                key: "home.name".into(),
            }
        );
        assert_eq!(
            Command::parse("set Score Title Grand final").unwrap(),
            Command::Set {
                input: "Score".into(),
                field: "Title".into(),
                value: vec!["Grand".into(), "final".into()],
            }
        );
        assert_eq!(
            Command::parse("disable 1").unwrap(),
            Command::Disable { input: "1".into() }
        );
        assert_eq!(
            Command::parse("connect 10.0.0.9").unwrap(),
            Command::Connect {
                host: "10.0.0.9".into(),
                port: DEFAULT_PORT,
            }
        );
        assert_eq!(Command::parse("exit").unwrap(), Command::Quit);
    }

    #[test]
    fn rejects_bad_commands() {
        assert!(Command::parse("").is_err());
        assert!(Command::parse("fly away").is_err());
        assert!(Command::parse("map Score HomeName colour home.color").is_err());
        assert!(Command::parse("set Score Title").is_err());
        assert!(Command::parse("connect 10.0.0.9 http").is_err());
    }

    #[tokio::test]
    async fn configure_then_push() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = make_app(&dir);
        app.handle(Command::parse("add Scoreboard Score").unwrap()).await.unwrap();
        app.handle(Command::parse("map Scoreboard HomeName text home.name").unwrap())
            .await
            .unwrap();

        let match_path = dir.path().join("match.json");
        std::fs::write(&match_path, r#"{"home":{"name":"Lions"}}"#).unwrap();
        let out = app.handle(Command::Load { file: match_path }).await.unwrap();
        assert!(out.ends_with("sent 1 command(s)"));

        let sent = app.sync().transport().sent.borrow();
        assert_eq!(sent[0].selected_name.as_deref(), Some("HomeName.Text"));
        assert_eq!(sent[0].value.as_deref(), Some("Lions"));
    }

    #[tokio::test]
    async fn edits_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = make_app(&dir);
        app.handle(Command::parse("add 1").unwrap()).await.unwrap();
        app.handle(Command::parse("bind scoreboard Scoreboard").unwrap())
            .await
            .unwrap();

        let saved = settings::load_settings_from(&dir.path().join("settings.json"));
        let config = courtside_core::migrate::load(&saved.mirror);
        assert_eq!(config.inputs.len(), 1);
        let id = &config.input_order[0];
        assert_eq!(config.overlay_bindings["scoreboard"], *id);
        assert_eq!(config.inputs[id].display_name, "Scoreboard");
    }

    #[tokio::test]
    async fn incompatible_mapping_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = make_app(&dir);
        app.handle(Command::parse("add Scoreboard").unwrap()).await.unwrap();
        let err = app
            .handle(Command::parse("map Scoreboard Logo image home.name").unwrap())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cannot feed"));
    }

    #[tokio::test]
    async fn overlay_errors_reach_the_operator() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = make_app(&dir);
        let err = app
            .handle(Command::Show { action: "scoreboard".into() })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "no input is assigned to \"scoreboard\"");
    }

    #[tokio::test]
    async fn connect_retargets_and_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = make_app(&dir);
        assert_eq!(app.sync().transport().base_url, "http://127.0.0.1:8088");

        let out = app.handle(Command::parse("connect 10.0.0.9 8099").unwrap()).await.unwrap();
        assert_eq!(out, "http://10.0.0.9:8099 is Connected");
        assert_eq!(app.sync().transport().base_url, "http://10.0.0.9:8099");

        app.handle(Command::Disconnect).await.unwrap();
        let saved = settings::load_settings_from(&dir.path().join("settings.json"));
        let config = courtside_core::migrate::load(&saved.mirror);
        assert_eq!(config.host, "10.0.0.9");
        assert_eq!(config.port, 8099);
        assert_eq!(config.connection_state, courtside_core::ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn removing_an_input_frees_its_overlay() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = make_app(&dir);
        app.handle(Command::parse("add Scoreboard").unwrap()).await.unwrap();
        app.handle(Command::parse("bind scoreboard Scoreboard").unwrap()).await.unwrap();
        app.handle(Command::parse("show scoreboard").unwrap()).await.unwrap();

        app.handle(Command::parse("remove Scoreboard").unwrap()).await.unwrap();
        assert!(app.sync().overlays().active_actions().is_empty());

        app.handle(Command::parse("add Scoreboard").unwrap()).await.unwrap();
        app.handle(Command::parse("bind set_summary Scoreboard").unwrap()).await.unwrap();
        app.handle(Command::parse("show set_summary").unwrap()).await.unwrap();
        assert_eq!(app.sync().overlays().active_actions(), vec!["set_summary"]);
        let sent = app.sync().transport().sent.borrow();
        let functions: Vec<String> = sent.iter().map(|c| c.function.wire_name()).collect();
        assert_eq!(
            functions,
            vec!["OverlayInput1In", "OverlayInput1Out", "OverlayInput1In"]
        );
    }
}

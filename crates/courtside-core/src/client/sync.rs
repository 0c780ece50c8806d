//! Pushes match data onto remote fields and routes overlay requests.
//!
//! The orchestrator owns the typed configuration, the field-discovery cache
//! and the overlay slots. Every configuration it accepts goes through the
//! migrator first. Remote failures are reported to the caller; they never
//! modify configuration beyond the connection state.

use crate::api::{normalize_color, RemoteCommand, RemoteFieldDescriptor, RemoteInputDescriptor};
use crate::assets;
use crate::catalog::{self, DataMapType};
use crate::client::cache::FieldCache;
use crate::client::transport::Transport;
use crate::client::xml::ParsedInput;
use crate::config::{ConnectionState, FieldMapping, FieldSource, InputConfig, MirrorConfig};
use crate::error::{SyncError, TransportError};
use crate::field::FieldKind;
use crate::match_state::{lookup_path, DataValue, MatchState};
use crate::migrate;
use crate::overlay::{OverlayController, OverlayTransition};
use crate::remap;
use crate::resolve;
use serde_json::Value;

/// Outcome of pushing one or more inputs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PushReport {
    pub sent: usize,
    /// (input id or field name, reason)
    pub skipped: Vec<(String, String)>,
    pub failed: Vec<(String, TransportError)>,
}

impl PushReport {
    fn merge(&mut self, other: PushReport) {
        self.sent += other.sent;
        self.skipped.extend(other.skipped);
        self.failed.extend(other.failed);
    }
}

/// Outcome of refreshing the remote input list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub inputs: Vec<RemoteInputDescriptor>,
    pub updated_ids: Vec<String>,
    pub unresolved_ids: Vec<String>,
    pub rebound_actions: Vec<String>,
}

/// True when both point at the same remote input the same way.
fn same_remote(before: &InputConfig, after: &InputConfig) -> bool {
    before.remote_key == after.remote_key
        && before.remote_title == after.remote_title
        && before.remote_number == after.remote_number
}

pub struct SyncOrchestrator<T: Transport> {
    config: MirrorConfig,
    transport: T,
    fields: FieldCache,
    overlays: OverlayController,
    asset_base_url: Option<String>,
}

impl<T: Transport> SyncOrchestrator<T> {
    /// Build from a persisted configuration blob of any schema version.
    pub fn new(config_blob: &Value, mut transport: T) -> Self {
        let config = migrate::load(config_blob);
        transport.set_base_url(&config.base_url());
        Self {
            config,
            transport,
            fields: FieldCache::new(),
            overlays: OverlayController::default(),
            asset_base_url: None,
        }
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Configuration as a blob ready to persist.
    pub fn config_blob(&self) -> Value {
        serde_json::to_value(&self.config).unwrap_or(Value::Null)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn field_cache(&self) -> &FieldCache {
        &self.fields
    }

    pub fn overlays(&self) -> &OverlayController {
        &self.overlays
    }

    pub fn set_asset_base_url(&mut self, base_url: Option<String>) {
        self.asset_base_url = base_url.filter(|u| !u.trim().is_empty());
    }

    /// Swap in a new configuration and keep the transport pointed at its
    /// host. Returns whether the remote system changed.
    fn install(&mut self, config: MirrorConfig) -> bool {
        let retargeted = config.base_url() != self.config.base_url();
        self.config = config;
        if retargeted {
            self.transport.set_base_url(&self.config.base_url());
            // Slots describe the previous remote system
            self.overlays.reset();
        }
        retargeted
    }

    /// Replace the configuration with a freshly loaded blob.
    pub fn apply_config(&mut self, config_blob: &Value) {
        self.install(migrate::load(config_blob));
        self.fields.invalidate_all();
    }

    /// Apply an edit and re-run the result through the migrator.
    ///
    /// Cached fields are dropped only for inputs that were removed or now
    /// point at a different remote input, or for all of them when the
    /// remote system itself changed.
    pub fn edit_config<F>(&mut self, edit: F)
    where
        F: FnOnce(&mut MirrorConfig),
    {
        let mut next = self.config.clone();
        edit(&mut next);
        let blob = match serde_json::to_value(&next) {
            Ok(blob) => blob,
            Err(e) => {
                log::error!("Failed to serialize edited configuration: {}", e);
                return;
            }
        };
        let next = migrate::load(&blob);
        let stale: Vec<String> = self
            .config
            .inputs
            .iter()
            .filter(|(id, before)| next.input(id).is_none_or(|after| !same_remote(before, after)))
            .map(|(id, _)| id.clone())
            .collect();
        if self.install(next) {
            self.fields.invalidate_all();
        } else {
            for id in &stale {
                self.fields.invalidate(id);
            }
        }
    }

    /// Point at another remote system and check whether it answers.
    pub async fn connect(&mut self, host: &str, port: u16) -> ConnectionState {
        let host = host.trim().to_string();
        log::info!("Connecting to {}:{}", host, port);
        self.edit_config(|config| {
            config.host = host;
            config.port = port;
        });
        self.check_connection().await
    }

    /// Mark the remote system as disconnected. Nothing is sent.
    pub fn disconnect(&mut self) {
        if self.config.connection_state != ConnectionState::Disconnected {
            log::info!("Disconnected from {}", self.config.base_url());
        }
        self.config.connection_state = ConnectionState::Disconnected;
    }

    /// Remove a configured input and return its internal id.
    ///
    /// Overlays on air on the input are taken down first. When that fails
    /// they are released anyway, so the slot does not stay held by an
    /// input that no longer exists.
    pub async fn remove_input(&mut self, input_key: &str) -> Result<String, SyncError> {
        let id = resolve::find(&self.config, input_key)
            .map(|found| found.id.to_string())
            .ok_or_else(|| SyncError::UnknownInput(input_key.to_string()))?;
        for action_id in self.overlays.actions_on_input(&id) {
            if let Err(e) = self.hide_overlay(&action_id).await {
                log::warn!(
                    "Could not take {} off air before removing input {}: {}",
                    action_id,
                    id,
                    e
                );
                self.overlays.release(&action_id);
            }
        }
        self.edit_config(|config| {
            config.remove_input(&id);
        });
        Ok(id)
    }

    fn note_transport_failure(&mut self, err: &TransportError) {
        if matches!(err, TransportError::Unreachable(_))
            && self.config.connection_state != ConnectionState::Disconnected
        {
            log::warn!("Remote system unreachable, marking disconnected");
            self.config.connection_state = ConnectionState::Disconnected;
        }
    }

    async fn fetch_state(&mut self) -> Result<Vec<ParsedInput>, SyncError> {
        match self.transport.fetch_state().await {
            Ok(state) => {
                self.config.connection_state = ConnectionState::Connected;
                Ok(state)
            }
            Err(e) => {
                log::warn!("Failed to fetch remote state: {}", e);
                self.config.connection_state = ConnectionState::Disconnected;
                Err(e.into())
            }
        }
    }

    /// Ask the remote system for its state and record whether it answered.
    pub async fn check_connection(&mut self) -> ConnectionState {
        let _ = self.fetch_state().await;
        self.config.connection_state
    }

    /// Fetch the live input list, heal renamed inputs, and drop cached
    /// fields of every input whose remote identity changed.
    pub async fn refresh_inputs(&mut self) -> Result<RefreshReport, SyncError> {
        let state = self.fetch_state().await?;
        let inputs: Vec<RemoteInputDescriptor> =
            state.into_iter().map(|parsed| parsed.descriptor).collect();
        let outcome = remap::reconcile(&self.config, &inputs);
        if outcome.changed() {
            log::info!("Remapped {} input(s)", outcome.updated_count);
            for id in &outcome.updated_ids {
                self.fields.invalidate(id);
            }
            let connection_state = self.config.connection_state;
            self.config = outcome.config;
            self.config.connection_state = connection_state;
        }
        Ok(RefreshReport {
            inputs,
            updated_ids: outcome.updated_ids,
            unresolved_ids: outcome.unresolved_ids,
            rebound_actions: outcome.rebound_actions,
        })
    }

    /// Fields of a configured input, from cache or by asking the remote.
    pub async fn discover_fields(
        &mut self,
        input_key: &str,
    ) -> Result<Vec<RemoteFieldDescriptor>, SyncError> {
        let (id, remote_key, reference) = {
            let found = resolve::find(&self.config, input_key)
                .ok_or_else(|| SyncError::UnknownInput(input_key.to_string()))?;
            (
                found.id.to_string(),
                found.input.remote_key().map(str::to_string),
                found.input.remote_reference().map(str::to_string),
            )
        };
        if let Some(cached) = self.fields.get(&id) {
            return Ok(cached.to_vec());
        }

        let ticket = self.fields.begin(&id);
        let state = match self.fetch_state().await {
            Ok(state) => state,
            Err(e) => {
                self.fields.invalidate(&id);
                return Err(e);
            }
        };
        let matched = state.into_iter().find(|parsed| {
            let d = &parsed.descriptor;
            match &remote_key {
                Some(key) => &d.key == key,
                None => reference
                    .as_deref()
                    .is_some_and(|r| d.title.trim() == r || d.number == r),
            }
        });
        let Some(parsed) = matched else {
            log::warn!("Input {} not found on remote system", id);
            self.fields.invalidate(&id);
            return Ok(Vec::new());
        };
        self.fields.complete(ticket, parsed.fields.clone());
        Ok(parsed.fields)
    }

    /// Commands that would bring one input in line with `state`.
    pub fn plan_input(
        &self,
        input_key: &str,
        state: &MatchState,
    ) -> Result<(Vec<RemoteCommand>, PushReport), SyncError> {
        let found = resolve::find(&self.config, input_key)
            .ok_or_else(|| SyncError::UnknownInput(input_key.to_string()))?;
        let mut report = PushReport::default();
        if !found.input.enabled {
            report
                .skipped
                .push((found.id.to_string(), "input disabled".to_string()));
            return Ok((Vec::new(), report));
        }
        let Some(reference) = found.input.remote_reference() else {
            log::warn!("Input {} has no remote title or number, skipping", found.id);
            report
                .skipped
                .push((found.id.to_string(), "no remote reference".to_string()));
            return Ok((Vec::new(), report));
        };

        let root = state.to_value();
        let remote_fields = self.fields.get(found.id);
        let mut commands = Vec::new();
        for (name, mapping) in &found.input.fields {
            if let Some(remote) = remote_fields {
                match remote.iter().find(|f| &f.name == name) {
                    None => {
                        report
                            .skipped
                            .push((name.clone(), "field not present on remote input".into()));
                        continue;
                    }
                    Some(f) if f.kind != mapping.kind => {
                        report.skipped.push((
                            name.clone(),
                            format!("remote field is {}, mapping is {}", f.kind, mapping.kind),
                        ));
                        continue;
                    }
                    Some(_) => {}
                }
            }
            match self.plan_field(found.input, reference, name, mapping, &root) {
                Ok(mut planned) => commands.append(&mut planned),
                Err(reason) => {
                    log::warn!("Skipping field {} of {}: {}", name, found.id, reason);
                    report.skipped.push((name.clone(), reason));
                }
            }
        }
        Ok((commands, report))
    }

    fn plan_field(
        &self,
        input: &InputConfig,
        reference: &str,
        name: &str,
        mapping: &FieldMapping,
        root: &Value,
    ) -> Result<Vec<RemoteCommand>, String> {
        let source = mapping.source().ok_or_else(|| "unmapped".to_string())?;
        let (value, data_type) = match source {
            FieldSource::Custom(v) => (Some(DataValue::Text(v.to_string())), None),
            FieldSource::DataMap(key) => (
                lookup_path(root, key),
                catalog::find(key).map(|e| e.data_type),
            ),
        };
        let text = || value.as_ref().map(DataValue::as_text).unwrap_or_default();

        match mapping.kind {
            FieldKind::Text => {
                if mapping.visible == Some(false) {
                    return Ok(vec![RemoteCommand::text_visibility(reference, name, false)]);
                }
                if data_type == Some(DataMapType::Visibility) {
                    let shown = value.as_ref().is_some_and(DataValue::is_truthy);
                    return Ok(vec![RemoteCommand::text_visibility(reference, name, shown)]);
                }
                let mut commands = Vec::new();
                if mapping.visible == Some(true) {
                    commands.push(RemoteCommand::text_visibility(reference, name, true));
                }
                if data_type == Some(DataMapType::Color) {
                    let raw = text();
                    let colour = normalize_color(&raw)
                        .ok_or_else(|| format!("invalid colour {:?}", raw))?;
                    commands.push(RemoteCommand::set_text_colour(reference, name, colour));
                } else {
                    commands.push(RemoteCommand::set_field(reference, name, FieldKind::Text, text()));
                }
                Ok(commands)
            }
            FieldKind::Image => {
                let url = assets::resolve_url(&text(), self.asset_base_url.as_deref());
                Ok(vec![RemoteCommand::set_field(reference, name, FieldKind::Image, url)])
            }
            FieldKind::Fill => {
                let raw = text();
                let colour = normalize_color(&raw).ok_or_else(|| {
                    format!("invalid colour {:?} for input {}", raw, input.display_name)
                })?;
                Ok(vec![RemoteCommand::set_field(reference, name, FieldKind::Fill, colour)])
            }
        }
    }

    /// Push one input. An unreachable remote aborts the push.
    pub async fn push_input(
        &mut self,
        input_key: &str,
        state: &MatchState,
    ) -> Result<PushReport, SyncError> {
        let (commands, mut report) = self.plan_input(input_key, state)?;
        for command in commands {
            match self.transport.send(&command).await {
                Ok(()) => report.sent += 1,
                Err(e @ TransportError::Unreachable(_)) => {
                    self.note_transport_failure(&e);
                    return Err(e.into());
                }
                Err(e) => {
                    let target = command.selected_name.clone().unwrap_or_default();
                    report.failed.push((target, e));
                }
            }
        }
        Ok(report)
    }

    /// Push every configured input in display order.
    pub async fn push_all(&mut self, state: &MatchState) -> Result<PushReport, SyncError> {
        let ids: Vec<String> = self.config.input_order.clone();
        let mut report = PushReport::default();
        for id in ids {
            report.merge(self.push_input(&id, state).await?);
        }
        log::debug!(
            "Pushed {} command(s), {} skipped, {} failed",
            report.sent,
            report.skipped.len(),
            report.failed.len()
        );
        Ok(report)
    }

    async fn deliver(&mut self, transition: OverlayTransition) -> Result<(), SyncError> {
        if let Err(e) = self.transport.send(&transition.command).await {
            self.note_transport_failure(&e);
            return Err(e.into());
        }
        self.overlays.commit(&transition)?;
        Ok(())
    }

    pub async fn show_overlay(&mut self, action_id: &str, state: &MatchState) -> Result<(), SyncError> {
        let transition = self.overlays.plan_show(action_id, &self.config, state)?;
        self.deliver(transition).await
    }

    pub async fn hide_overlay(&mut self, action_id: &str) -> Result<(), SyncError> {
        let transition = self.overlays.plan_hide(action_id, &self.config)?;
        self.deliver(transition).await
    }

    /// Show when idle, hide when on air. Returns whether it is now on air.
    pub async fn toggle_overlay(&mut self, action_id: &str, state: &MatchState) -> Result<bool, SyncError> {
        let transition = self.overlays.plan_toggle(action_id, &self.config, state)?;
        let show = transition.show;
        self.deliver(transition).await?;
        Ok(show)
    }

    pub fn is_overlay_blocked(&self, action_id: &str) -> bool {
        self.overlays.is_blocked(action_id, &self.config)
    }
}

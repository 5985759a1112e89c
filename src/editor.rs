use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::api::{ApiError, ConfigApi};
use crate::import::parse_import;
use crate::tags::parse_tags;
use crate::tunnel::{ConfigDocument, Tunnel};
use crate::validate::{self, Duplicates, Field, field_errors, find_duplicates};
use crate::view::{self, ViewQuery};

/// Liveness of the config API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Health {
    #[default]
    Checking,
    Ok,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortStatus {
    Ok,
    Busy,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortCheck {
    pub port: i64,
    pub status: PortStatus,
    pub message: String,
}

impl PortCheck {
    fn new(port: i64, status: PortStatus, message: impl Into<String>) -> Self {
        Self {
            port,
            status,
            message: message.into(),
        }
    }
}

/// Result of asking to select another record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Switched,
    /// Unsaved edits exist; resolve with `switch_saving`, `switch_discarding` or `cancel_switch`.
    Pending(usize),
}

/// The editable copy of the remote document plus everything derived from it.
///
/// Each operation mutates this value in place and reports user-facing text
/// through the `message`/`error` slots. Derived data (validation, duplicates,
/// views) is recomputed on every call.
#[derive(Debug, Default)]
pub struct EditorState {
    pub doc: ConfigDocument,
    pub last_saved: Option<ConfigDocument>,
    pub selected: usize,
    pub pending_save: bool,
    pub saving: bool,
    pub pending_switch: Option<usize>,
    pub message: Option<String>,
    pub error: Option<String>,
    pub health: Health,
    pub port_check: Option<PortCheck>,
}

impl EditorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tunnels(&self) -> &[Tunnel] {
        &self.doc.tunnels
    }

    pub fn selected_tunnel(&self) -> Option<&Tunnel> {
        self.doc.tunnels.get(self.selected)
    }

    fn clear_messages(&mut self) {
        self.message = None;
        self.error = None;
    }

    fn fail(&mut self, err: impl ToString) {
        self.error = Some(err.to_string());
    }

    // ─── Derived state ──────────────────────────────────────

    pub fn field_errors(&self) -> BTreeMap<Field, String> {
        self.selected_tunnel().map(field_errors).unwrap_or_default()
    }

    pub fn duplicates(&self) -> Duplicates {
        find_duplicates(&self.doc.tunnels)
    }

    /// Reasons a save is refused right now, independent of the dirty flag.
    pub fn save_blockers(&self) -> Vec<String> {
        let mut reasons = Vec::new();
        if !self.duplicates().is_empty() {
            reasons.push("resolve duplicate names or ports first".to_string());
        }
        if !self.field_errors().is_empty() {
            reasons.push("fix the invalid fields before saving".to_string());
        }
        reasons
    }

    pub fn can_save(&self) -> bool {
        !self.saving && self.pending_save && self.save_blockers().is_empty()
    }

    pub fn visible(&self, query: &ViewQuery) -> Vec<usize> {
        view::visible_indices(&self.doc.tunnels, query)
    }

    pub fn active_count(&self) -> usize {
        view::active_count(&self.doc.tunnels)
    }

    pub fn inactive_count(&self) -> usize {
        self.doc.tunnels.len() - self.active_count()
    }

    // ─── Remote sync ────────────────────────────────────────

    /// Fetch the document. On failure the current document is left alone.
    pub fn load(&mut self, api: &dyn ConfigApi) -> bool {
        self.clear_messages();
        match api.get_config() {
            Ok(doc) => {
                log::info!("loaded {} tunnels", doc.tunnels.len());
                self.last_saved = Some(doc.clone());
                self.doc = doc;
                self.selected = 0;
                self.pending_save = false;
                self.pending_switch = None;
                true
            }
            Err(e) => {
                log::warn!("load failed: {}", e);
                self.fail(e);
                false
            }
        }
    }

    /// PUT `doc` (or the current document) as a whole.
    pub fn save(&mut self, api: &dyn ConfigApi, doc: Option<ConfigDocument>) -> bool {
        if self.saving {
            self.fail("a save is already in progress");
            return false;
        }
        let payload = doc.unwrap_or_else(|| self.doc.clone());
        self.saving = true;
        self.clear_messages();

        let result = api.put_config(&payload);
        self.saving = false;
        match result {
            Ok(()) => {
                log::info!("saved {} tunnels", payload.tunnels.len());
                self.message = Some("configuration saved".to_string());
                self.pending_save = false;
                self.last_saved = Some(payload);
                true
            }
            Err(e) => {
                if let ApiError::Status { status, .. } = &e {
                    log::warn!("save rejected with status {}", status);
                }
                self.fail(e);
                false
            }
        }
    }

    pub fn check_health(&mut self, api: &dyn ConfigApi) -> Health {
        self.health = match api.health() {
            Ok(()) => Health::Ok,
            Err(e) => {
                log::debug!("health check failed: {}", e);
                Health::Down
            }
        };
        self.health
    }

    /// Ask the server whether `port` is bound. Out-of-range ports and ports
    /// already used by a record are answered locally.
    pub fn check_port(&mut self, api: &dyn ConfigApi, port: i64) -> &PortCheck {
        let result = if !validate::is_port_valid(port) {
            PortCheck::new(port, PortStatus::Error, "port must be between 1 and 65535")
        } else if self.doc.tunnels.iter().any(|t| t.local_port == port) {
            PortCheck::new(
                port,
                PortStatus::Error,
                "port is already configured in the tunnel list",
            )
        } else {
            // is_port_valid bounds the value to u16 range
            match api.port_in_use(port as u16) {
                Ok(true) => PortCheck::new(port, PortStatus::Busy, "port is in use"),
                Ok(false) => PortCheck::new(port, PortStatus::Ok, "port is available"),
                Err(e) => PortCheck::new(port, PortStatus::Error, e.to_string()),
            }
        };
        self.port_check.insert(result)
    }

    // ─── Selection & dirty guard ────────────────────────────

    pub fn select(&mut self, index: usize) -> Selection {
        if self.pending_save && index != self.selected {
            self.pending_switch = Some(index);
            return Selection::Pending(index);
        }
        self.selected = index;
        self.pending_switch = None;
        self.clear_messages();
        Selection::Switched
    }

    /// Save the document, then move to the pending record. Stays pending when
    /// the document cannot be saved or the save fails.
    pub fn switch_saving(&mut self, api: &dyn ConfigApi) -> bool {
        let Some(target) = self.pending_switch else {
            return false;
        };
        if self.saving {
            self.fail("a save is already in progress");
            return false;
        }
        let blockers = self.save_blockers();
        if !blockers.is_empty() {
            self.error = Some(blockers.join("; "));
            return false;
        }
        if !self.save(api, None) {
            return false;
        }
        self.selected = target;
        self.pending_switch = None;
        self.clear_messages();
        true
    }

    /// Revert the entire document to the last saved snapshot, then switch.
    pub fn switch_discarding(&mut self) -> bool {
        let Some(target) = self.pending_switch.take() else {
            return false;
        };
        if let Some(saved) = &self.last_saved {
            self.doc = saved.clone();
            self.pending_save = false;
        }
        self.selected = target.min(self.doc.tunnels.len().saturating_sub(1));
        self.message = Some("changes discarded".to_string());
        self.error = None;
        true
    }

    pub fn cancel_switch(&mut self) {
        self.pending_switch = None;
    }

    // ─── Mutation ───────────────────────────────────────────

    /// Apply raw text to one field of the selected record.
    pub fn set_field(&mut self, field: Field, raw: &str) -> Result<()> {
        let tunnel = self
            .doc
            .tunnels
            .get_mut(self.selected)
            .context("no tunnel selected")?;

        match field {
            Field::Name => tunnel.name = raw.to_string(),
            Field::Tags => tunnel.tags = parse_tags(raw),
            Field::Enabled => tunnel.enabled = parse_bool(raw)?,
            Field::LocalPort => tunnel.local_port = validate::to_number(raw),
            Field::DestHost => tunnel.dest_host = raw.to_string(),
            Field::DestPort => tunnel.dest_port = validate::to_number(raw),
            Field::SshUser => tunnel.ssh_user = raw.to_string(),
            Field::SshHost => tunnel.ssh_host = raw.to_string(),
            Field::SshPort => {
                tunnel.ssh_port = if raw.trim().is_empty() {
                    None
                } else {
                    Some(validate::to_number(raw))
                }
            }
        }
        self.message = None;
        self.pending_save = true;
        Ok(())
    }

    pub fn set_tags(&mut self, tags: &[String]) -> Result<()> {
        let tunnel = self
            .doc
            .tunnels
            .get_mut(self.selected)
            .context("no tunnel selected")?;
        tunnel.tags = tags.to_vec();
        self.message = None;
        self.pending_save = true;
        Ok(())
    }

    pub fn add_tunnel(&mut self) {
        self.doc.tunnels.push(Tunnel::empty());
        self.selected = self.doc.tunnels.len() - 1;
        self.message = None;
        self.pending_save = true;
    }

    /// Drop the selected record and immediately save the result.
    pub fn remove_selected(&mut self, api: &dyn ConfigApi) -> bool {
        if self.selected_tunnel().is_none() {
            return false;
        }
        let removed = self.doc.tunnels.remove(self.selected);
        log::info!("removing tunnel '{}'", removed.name);
        self.selected = self.selected.saturating_sub(1);
        self.pending_save = true;
        let next = self.doc.clone();
        self.save(api, Some(next))
    }

    /// Replace the whole document with validated JSON. Does not save.
    pub fn import(&mut self, text: &str) -> Result<()> {
        match parse_import(text) {
            Ok(doc) => {
                log::info!("imported {} tunnels", doc.tunnels.len());
                self.doc = doc;
                self.selected = 0;
                self.pending_save = true;
                self.pending_switch = None;
                self.error = None;
                self.message = Some("JSON imported; save to apply".to_string());
                Ok(())
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    pub fn export(&mut self, path: &Path) -> Result<()> {
        let json = self
            .doc
            .to_pretty_json()
            .context("failed to serialize configuration")?;
        fs::write(path, json + "\n")
            .with_context(|| format!("failed to write {}", path.display()))?;
        self.message = Some(format!("exported to {}", path.display()));
        Ok(())
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "on" | "1" => Ok(true),
        "false" | "no" | "n" | "off" | "0" => Ok(false),
        other => bail!("'{}' is not a boolean (use true/false)", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    /// In-memory stand-in for the config API that records every call.
    #[derive(Default)]
    struct FakeApi {
        stored: RefCell<ConfigDocument>,
        calls: RefCell<Vec<String>>,
        put_status: Cell<Option<u16>>,
        get_status: Cell<Option<u16>>,
        down: Cell<bool>,
        in_use: Cell<Option<bool>>,
    }

    impl FakeApi {
        fn with(tunnels: Vec<Tunnel>) -> Self {
            let api = Self::default();
            *api.stored.borrow_mut() = ConfigDocument {
                tunnels,
                ..Default::default()
            };
            api.in_use.set(Some(false));
            api
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        fn fail(status: u16, message: &str) -> ApiError {
            ApiError::Status {
                status,
                message: message.to_string(),
            }
        }
    }

    impl ConfigApi for FakeApi {
        fn health(&self) -> Result<(), ApiError> {
            self.calls.borrow_mut().push("health".into());
            if self.down.get() {
                Err(Self::fail(503, "health check failed: 503"))
            } else {
                Ok(())
            }
        }

        fn get_config(&self) -> Result<ConfigDocument, ApiError> {
            self.calls.borrow_mut().push("get".into());
            match self.get_status.get() {
                Some(code) => Err(Self::fail(code, &format!("failed to load: {}", code))),
                None => Ok(self.stored.borrow().clone()),
            }
        }

        fn put_config(&self, doc: &ConfigDocument) -> Result<(), ApiError> {
            self.calls.borrow_mut().push("put".into());
            match self.put_status.get() {
                Some(code) => Err(Self::fail(code, &format!("failed to save: {}", code))),
                None => {
                    *self.stored.borrow_mut() = doc.clone();
                    Ok(())
                }
            }
        }

        fn port_in_use(&self, port: u16) -> Result<bool, ApiError> {
            self.calls.borrow_mut().push(format!("port-check {}", port));
            self.in_use.get().ok_or(ApiError::UnexpectedResponse)
        }
    }

    fn tunnel(name: &str, port: i64) -> Tunnel {
        Tunnel {
            name: name.into(),
            local_port: port,
            dest_host: "10.0.0.5".into(),
            dest_port: 80,
            ssh_user: "ops".into(),
            ssh_host: "10.0.0.1".into(),
            ..Tunnel::empty()
        }
    }

    fn loaded(api: &FakeApi) -> EditorState {
        let mut state = EditorState::new();
        assert!(state.load(api));
        state
    }

    #[test]
    fn load_replaces_state_and_snapshot() {
        let api = FakeApi::with(vec![tunnel("a", 1), tunnel("b", 2)]);
        let mut state = EditorState::new();
        state.selected = 1;
        state.pending_save = true;
        state.error = Some("old".into());

        assert!(state.load(&api));
        assert_eq!(state.tunnels().len(), 2);
        assert_eq!(state.last_saved.as_ref(), Some(&state.doc));
        assert_eq!(state.selected, 0);
        assert!(!state.pending_save);
        assert!(state.error.is_none());
    }

    #[test]
    fn failed_load_keeps_previous_document() {
        let api = FakeApi::with(vec![tunnel("a", 1)]);
        let mut state = loaded(&api);
        state.set_field(Field::Name, "edited").unwrap();

        api.get_status.set(Some(500));
        assert!(!state.load(&api));
        assert_eq!(state.error.as_deref(), Some("failed to load: 500"));
        assert_eq!(state.tunnels()[0].name, "edited");
        assert!(state.pending_save);
    }

    #[test]
    fn save_updates_snapshot_and_clears_dirty() {
        let api = FakeApi::with(vec![tunnel("a", 1)]);
        let mut state = loaded(&api);
        state.set_field(Field::DestPort, "443").unwrap();
        assert!(state.can_save());

        assert!(state.save(&api, None));
        assert!(!state.pending_save);
        assert!(!state.saving);
        assert_eq!(state.message.as_deref(), Some("configuration saved"));
        assert_eq!(api.stored.borrow().tunnels[0].dest_port, 443);
        assert_eq!(state.last_saved.as_ref().unwrap().tunnels[0].dest_port, 443);
    }

    #[test]
    fn failed_save_surfaces_message() {
        let api = FakeApi::with(vec![tunnel("a", 1)]);
        let mut state = loaded(&api);
        state.set_field(Field::DestPort, "443").unwrap();
        api.put_status.set(Some(400));

        assert!(!state.save(&api, None));
        assert_eq!(state.error.as_deref(), Some("failed to save: 400"));
        assert!(state.pending_save);
        assert_eq!(state.last_saved.as_ref().unwrap().tunnels[0].dest_port, 80);
    }

    #[test]
    fn reentrant_save_refused() {
        let api = FakeApi::with(vec![tunnel("a", 1)]);
        let mut state = loaded(&api);
        state.saving = true;
        assert!(!state.save(&api, None));
        assert!(!api.calls().contains(&"put".to_string()));
    }

    #[test]
    fn health_maps_failures_to_down() {
        let api = FakeApi::with(vec![]);
        let mut state = EditorState::new();
        assert_eq!(state.health, Health::Checking);
        assert_eq!(state.check_health(&api), Health::Ok);
        api.down.set(true);
        assert_eq!(state.check_health(&api), Health::Down);
    }

    #[test]
    fn out_of_range_port_never_hits_network() {
        let api = FakeApi::with(vec![]);
        let mut state = loaded(&api);
        let result = state.check_port(&api, 70000).clone();
        assert_eq!(result.status, PortStatus::Error);
        assert_eq!(result.message, "port must be between 1 and 65535");
        assert!(!api.calls().iter().any(|c| c.starts_with("port-check")));
        assert_eq!(state.check_port(&api, 0).status, PortStatus::Error);
    }

    #[test]
    fn locally_used_port_never_hits_network() {
        let api = FakeApi::with(vec![tunnel("a", 2222)]);
        let mut state = loaded(&api);
        assert_eq!(state.check_port(&api, 2222).status, PortStatus::Error);
        assert!(!api.calls().iter().any(|c| c.starts_with("port-check")));
    }

    #[test]
    fn remote_port_check_results() {
        let api = FakeApi::with(vec![]);
        let mut state = loaded(&api);

        assert_eq!(state.check_port(&api, 8080).status, PortStatus::Ok);
        api.in_use.set(Some(true));
        assert_eq!(state.check_port(&api, 8080).status, PortStatus::Busy);
        api.in_use.set(None);
        let result = state.check_port(&api, 8080);
        assert_eq!(result.status, PortStatus::Error);
        assert_eq!(result.message, "unexpected response from server");
        assert_eq!(
            api.calls().iter().filter(|c| *c == "port-check 8080").count(),
            3
        );
    }

    #[test]
    fn clean_select_switches_immediately() {
        let api = FakeApi::with(vec![tunnel("a", 1), tunnel("b", 2)]);
        let mut state = loaded(&api);
        state.message = Some("hi".into());
        assert_eq!(state.select(1), Selection::Switched);
        assert_eq!(state.selected, 1);
        assert!(state.message.is_none());
    }

    #[test]
    fn dirty_select_requires_confirmation() {
        let api = FakeApi::with(vec![tunnel("a", 1), tunnel("b", 2)]);
        let mut state = loaded(&api);
        state.set_field(Field::Name, "a2").unwrap();

        assert_eq!(state.select(1), Selection::Pending(1));
        assert_eq!(state.selected, 0);
        assert_eq!(state.pending_switch, Some(1));
        // reselecting the current record is not a switch
        assert_eq!(state.select(0), Selection::Switched);
    }

    #[test]
    fn discard_reverts_whole_document() {
        let api = FakeApi::with(vec![tunnel("a", 1), tunnel("b", 2), tunnel("c", 3)]);
        let mut state = loaded(&api);
        state.select(2);
        state.set_field(Field::Name, "c2").unwrap();
        state.pending_save = true;
        state.selected = 0;
        state.set_field(Field::Name, "a2").unwrap();

        assert_eq!(state.select(1), Selection::Pending(1));
        assert!(state.switch_discarding());
        assert_eq!(state.selected, 1);
        assert!(!state.pending_save);
        assert_eq!(state.tunnels()[0].name, "a");
        assert_eq!(state.tunnels()[2].name, "c");
        assert_eq!(state.message.as_deref(), Some("changes discarded"));
    }

    #[test]
    fn save_and_switch_blocked_by_field_errors() {
        let api = FakeApi::with(vec![tunnel("a", 1), tunnel("b", 2)]);
        let mut state = loaded(&api);
        state.set_field(Field::DestHost, "not-an-ip").unwrap();
        state.select(1);

        assert!(!state.switch_saving(&api));
        assert_eq!(state.pending_switch, Some(1));
        assert_eq!(state.selected, 0);
        assert!(state.error.is_some());
        assert!(!api.calls().contains(&"put".to_string()));
    }

    #[test]
    fn save_and_switch_blocked_by_duplicates_elsewhere() {
        let api = FakeApi::with(vec![tunnel("a", 1), tunnel("b", 2), tunnel("c", 3)]);
        let mut state = loaded(&api);
        state.selected = 2;
        state.set_field(Field::LocalPort, "2").unwrap();
        state.selected = 0;
        state.set_field(Field::DestPort, "81").unwrap();
        assert!(state.field_errors().is_empty());

        state.select(1);
        assert!(!state.switch_saving(&api));
        assert_eq!(state.pending_switch, Some(1));
        assert!(!state.can_save());
    }

    #[test]
    fn save_and_switch_succeeds() {
        let api = FakeApi::with(vec![tunnel("a", 1), tunnel("b", 2)]);
        let mut state = loaded(&api);
        state.set_field(Field::Name, "alpha").unwrap();
        state.select(1);

        assert!(state.switch_saving(&api));
        assert_eq!(state.selected, 1);
        assert!(state.pending_switch.is_none());
        assert!(!state.pending_save);
        assert_eq!(api.stored.borrow().tunnels[0].name, "alpha");
    }

    #[test]
    fn save_and_switch_stays_open_when_save_fails() {
        let api = FakeApi::with(vec![tunnel("a", 1), tunnel("b", 2)]);
        let mut state = loaded(&api);
        state.set_field(Field::Name, "alpha").unwrap();
        state.select(1);
        api.put_status.set(Some(500));

        assert!(!state.switch_saving(&api));
        assert_eq!(state.selected, 0);
        assert_eq!(state.pending_switch, Some(1));
        assert_eq!(state.error.as_deref(), Some("failed to save: 500"));
    }

    #[test]
    fn save_and_switch_during_save_reports_why() {
        let api = FakeApi::with(vec![tunnel("a", 1), tunnel("b", 2)]);
        let mut state = loaded(&api);
        state.set_field(Field::Name, "alpha").unwrap();
        state.select(1);
        state.saving = true;

        assert!(!state.switch_saving(&api));
        assert_eq!(state.error.as_deref(), Some("a save is already in progress"));
        assert_eq!(state.pending_switch, Some(1));
        assert!(!api.calls().contains(&"put".to_string()));
    }

    #[test]
    fn cancel_switch_keeps_edits() {
        let api = FakeApi::with(vec![tunnel("a", 1), tunnel("b", 2)]);
        let mut state = loaded(&api);
        state.set_field(Field::Name, "alpha").unwrap();
        state.select(1);
        state.cancel_switch();
        assert!(state.pending_switch.is_none());
        assert_eq!(state.selected, 0);
        assert_eq!(state.tunnels()[0].name, "alpha");
        assert!(state.pending_save);
    }

    #[test]
    fn set_field_semantics() {
        let api = FakeApi::with(vec![tunnel("a", 1)]);
        let mut state = loaded(&api);

        state.set_field(Field::LocalPort, "abc").unwrap();
        assert_eq!(state.tunnels()[0].local_port, 0);
        state.set_field(Field::SshPort, "").unwrap();
        assert_eq!(state.tunnels()[0].ssh_port, None);
        state.set_field(Field::SshPort, "2200").unwrap();
        assert_eq!(state.tunnels()[0].ssh_port, Some(2200));
        state.set_field(Field::Tags, " a, b ,,c ").unwrap();
        assert_eq!(state.tunnels()[0].tags, vec!["a", "b", "c"]);
        state.set_field(Field::Enabled, "off").unwrap();
        assert!(!state.tunnels()[0].enabled);
        assert!(state.set_field(Field::Enabled, "maybe").is_err());
        assert!(state.pending_save);
    }

    #[test]
    fn set_field_stores_text_as_typed() {
        let api = FakeApi::with(vec![tunnel("a", 1)]);
        let mut state = loaded(&api);

        state.set_field(Field::Name, "  web  ").unwrap();
        state.set_field(Field::DestHost, " 10.0.0.7 ").unwrap();
        state.set_field(Field::LocalPort, " 8080 ").unwrap();
        let t = &state.tunnels()[0];
        assert_eq!(t.name, "  web  ");
        assert_eq!(t.dest_host, " 10.0.0.7 ");
        assert_eq!(t.local_port, 8080);

        state.set_field(Field::SshUser, "   ").unwrap();
        assert_eq!(state.tunnels()[0].ssh_user, "   ");
        assert!(state.field_errors().contains_key(&Field::SshUser));
    }

    #[test]
    fn set_field_without_selection_fails() {
        let mut state = EditorState::new();
        assert!(state.set_field(Field::Name, "x").is_err());
        assert!(state.field_errors().is_empty());
    }

    #[test]
    fn add_selects_new_record() {
        let api = FakeApi::with(vec![tunnel("a", 1)]);
        let mut state = loaded(&api);
        state.add_tunnel();
        assert_eq!(state.selected, 1);
        assert!(state.pending_save);
        assert_eq!(state.selected_tunnel(), Some(&Tunnel::empty()));
        assert!(!state.can_save());
    }

    #[test]
    fn remove_saves_immediately() {
        let api = FakeApi::with(vec![tunnel("a", 1), tunnel("b", 2)]);
        let mut state = loaded(&api);
        state.select(1);

        assert!(state.remove_selected(&api));
        assert_eq!(state.selected, 0);
        assert!(!state.pending_save);
        assert_eq!(api.stored.borrow().tunnels.len(), 1);
        assert_eq!(api.stored.borrow().tunnels[0].name, "a");
    }

    #[test]
    fn remove_without_selection_is_noop() {
        let api = FakeApi::with(vec![]);
        let mut state = loaded(&api);
        assert!(!state.remove_selected(&api));
        assert!(!api.calls().contains(&"put".to_string()));
    }

    #[test]
    fn import_replaces_without_saving() {
        let api = FakeApi::with(vec![tunnel("a", 1), tunnel("b", 2)]);
        let mut state = loaded(&api);
        state.selected = 1;

        let text = r#"{"tunnels":[{"name":"x","local_port":2222,"dest_host":"1.1.1.1","dest_port":80,"ssh_user":"u","ssh_host":"2.2.2.2"}]}"#;
        state.import(text).unwrap();
        assert_eq!(state.tunnels().len(), 1);
        assert_eq!(state.selected, 0);
        assert!(state.pending_save);
        assert_eq!(state.tunnels()[0].ssh_port, None);
        assert!(!api.calls().contains(&"put".to_string()));
    }

    #[test]
    fn rejected_import_leaves_document() {
        let api = FakeApi::with(vec![tunnel("a", 1)]);
        let mut state = loaded(&api);
        let before = state.doc.clone();

        let text = r#"{"tunnels":[
            {"name":"x","local_port":2222,"dest_host":"1.1.1.1","dest_port":80,"ssh_user":"u","ssh_host":"2.2.2.2"},
            {"name":"y","local_port":2222,"dest_host":"1.1.1.1","dest_port":80,"ssh_user":"u","ssh_host":"2.2.2.2"}
        ]}"#;
        let err = state.import(text).unwrap_err().to_string();
        assert!(err.contains("2222"));
        assert_eq!(state.doc, before);
        assert!(!state.pending_save);
        assert_eq!(state.error.as_deref(), Some(err.as_str()));
    }

    #[test]
    fn export_writes_pretty_json() {
        let api = FakeApi::with(vec![tunnel("a", 1)]);
        let mut state = loaded(&api);
        let path = std::env::temp_dir().join("tunconf_test_export.json");

        state.export(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(written.contains("\n  \"tunnels\": ["));
        let doc: ConfigDocument = serde_json::from_str(&written).unwrap();
        assert_eq!(doc, state.doc);
    }

    #[test]
    fn counts_follow_document() {
        let mut off = tunnel("b", 2);
        off.enabled = false;
        let api = FakeApi::with(vec![tunnel("a", 1), off]);
        let state = loaded(&api);
        assert_eq!(state.active_count(), 1);
        assert_eq!(state.inactive_count(), 1);
        assert_eq!(state.visible(&ViewQuery::default()), vec![0, 1]);
    }
}

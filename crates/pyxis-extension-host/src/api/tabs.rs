//! Tab façade
//!
//! Ownership rule: every tab created through this façade receives an id
//! prefixed with `ext-<extensionId>-`. Any operation on an id without that
//! prefix is refused and logged; the prefix check substitutes for
//! pointer-level isolation of the shared tab store.

use crate::registries::tabs::{
    CreateTabOptions, Tab, TabCloseCallback, TabRegistry, TabType, TabUpdate, tab_id_prefix,
    tab_kind,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Per-extension tab capability
#[derive(Clone)]
pub struct TabApi {
    extension_id: String,
    registry: Arc<TabRegistry>,
}

impl TabApi {
    /// Create a façade bound to one extension.
    pub fn new(extension_id: impl Into<String>, registry: Arc<TabRegistry>) -> Self {
        Self {
            extension_id: extension_id.into(),
            registry,
        }
    }

    /// The owning extension id.
    pub fn extension_id(&self) -> &str {
        &self.extension_id
    }

    fn owns(&self, tab_id: &str) -> bool {
        tab_id.starts_with(&tab_id_prefix(&self.extension_id))
    }

    fn refuse(&self, operation: &str, tab_id: &str) {
        warn!(
            "{} refused: '{}' is not owned by {}",
            operation, tab_id, self.extension_id
        );
    }

    /// Register this extension's tab type.
    pub fn register_tab_type(
        &self,
        display_name: impl Into<String>,
        icon: Option<String>,
        component: impl Into<String>,
    ) -> String {
        let kind = tab_kind(&self.extension_id);
        self.registry.register_type(TabType {
            kind: kind.clone(),
            extension_id: self.extension_id.clone(),
            display_name: display_name.into(),
            icon,
            component: component.into(),
        });
        kind
    }

    /// Create (or re-activate) a tab.
    ///
    /// If `data.noteKey` is set and a tab of this extension's kind already
    /// carries the same key, that tab is activated and its id returned
    /// instead of creating a duplicate.
    pub fn create_tab(
        &self,
        name: impl Into<String>,
        data: Value,
        opts: CreateTabOptions,
    ) -> String {
        let kind = tab_kind(&self.extension_id);
        if let Some(note_key) = data.get("noteKey").and_then(Value::as_str) {
            if let Some(existing) = self.registry.find_by_note_key(&kind, note_key) {
                debug!(
                    "Reusing tab '{}' for noteKey '{}'",
                    existing.tab_id, note_key
                );
                self.registry.activate(&existing.tab_id);
                return existing.tab_id;
            }
        }

        let tab_type = self.registry.type_for_kind(&kind).unwrap_or(TabType {
            kind: kind.clone(),
            extension_id: self.extension_id.clone(),
            display_name: self.extension_id.clone(),
            icon: None,
            component: String::new(),
        });
        let tab = tab_type.create_tab(name, data, &opts);
        let tab_id = tab.tab_id.clone();
        self.registry.insert_tab(tab);
        tab_id
    }

    /// Update a tab owned by this extension.
    pub fn update_tab(&self, tab_id: &str, update: TabUpdate) -> bool {
        if !self.owns(tab_id) {
            self.refuse("update_tab", tab_id);
            return false;
        }
        self.registry.update_tab(tab_id, update)
    }

    /// Close a tab owned by this extension.
    pub fn close_tab(&self, tab_id: &str) -> bool {
        if !self.owns(tab_id) {
            self.refuse("close_tab", tab_id);
            return false;
        }
        self.registry.close_tab(tab_id)
    }

    /// Read the data of a tab owned by this extension.
    pub fn tab_data(&self, tab_id: &str) -> Option<Value> {
        if !self.owns(tab_id) {
            self.refuse("tab_data", tab_id);
            return None;
        }
        self.registry.tab(tab_id).map(|t| t.data)
    }

    /// Register a close callback on a tab owned by this extension.
    pub fn on_tab_close(&self, tab_id: &str, callback: TabCloseCallback) -> bool {
        if !self.owns(tab_id) {
            self.refuse("on_tab_close", tab_id);
            return false;
        }
        self.registry.on_close(tab_id, callback);
        true
    }

    /// Open tabs owned by this extension.
    pub fn own_tabs(&self) -> Vec<Tab> {
        self.registry.tabs_for_extension(&self.extension_id)
    }

    /// Remove the extension's tab type and every tab it owns.
    ///
    /// Close callbacks run best-effort with failures swallowed.
    pub fn dispose(&self) {
        self.registry.unregister_all(&self.extension_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn api(extension_id: &str, registry: &Arc<TabRegistry>) -> TabApi {
        TabApi::new(extension_id, registry.clone())
    }

    #[test]
    fn test_created_tab_carries_prefix() {
        let registry = Arc::new(TabRegistry::new());
        let tabs = api("x.notes", &registry);
        tabs.register_tab_type("Notes", None, "NotesView");

        let tab_id = tabs.create_tab("One", json!({}), CreateTabOptions::default());
        assert!(tab_id.starts_with("ext-x.notes-"));
    }

    #[test]
    fn test_foreign_tab_refused() {
        let registry = Arc::new(TabRegistry::new());
        let x = api("x.notes", &registry);
        let y = api("y.other", &registry);
        x.register_tab_type("Notes", None, "NotesView");

        let tab_id = x.create_tab("One", json!({"v": 1}), CreateTabOptions::default());

        assert!(!y.update_tab(
            &tab_id,
            TabUpdate {
                name: Some("hijack".to_string()),
                ..Default::default()
            }
        ));
        assert!(!y.close_tab(&tab_id));
        assert!(y.tab_data(&tab_id).is_none());
        assert!(!y.on_tab_close(&tab_id, Arc::new(|| {})));

        // No mutation happened.
        assert_eq!(registry.tab(&tab_id).unwrap().name, "One");
        assert_eq!(x.tab_data(&tab_id), Some(json!({"v": 1})));
    }

    #[test]
    fn test_note_key_dedup() {
        let registry = Arc::new(TabRegistry::new());
        let tabs = api("x.notes", &registry);
        tabs.register_tab_type("Notes", None, "NotesView");

        let first = tabs.create_tab("One", json!({"noteKey": "n1"}), Default::default());
        let second = tabs.create_tab("Two", json!({"noteKey": "n1"}), Default::default());

        assert_eq!(first, second);
        assert_eq!(registry.tabs().len(), 1);
        assert_eq!(registry.active_tab(), Some(first));
    }

    #[test]
    fn test_dispose_removes_exactly_own_entries() {
        let registry = Arc::new(TabRegistry::new());
        let x = api("x.notes", &registry);
        let y = api("y.other", &registry);
        x.register_tab_type("Notes", None, "NotesView");
        y.register_tab_type("Other", None, "OtherView");

        x.create_tab("A", json!({}), Default::default());
        x.create_tab("B", json!({}), Default::default());
        y.create_tab("C", json!({}), Default::default());

        x.dispose();

        assert!(x.own_tabs().is_empty());
        assert_eq!(y.own_tabs().len(), 1);
        assert!(registry.type_for_kind("extension:y.other").is_some());
        assert!(registry.type_for_kind("extension:x.notes").is_none());
    }
}

//! Tab registry
//!
//! Holds the tab types contributed by extensions plus the open tab
//! instances. Tab ownership is provable from the id: every tab created
//! through an extension's façade carries the `ext-<extensionId>-` prefix,
//! and the tab kind for an extension is always `extension:<extensionId>`.

use super::ChangeListeners;
use super::ListenerHandle;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

/// The tab kind registered for an extension.
pub fn tab_kind(extension_id: &str) -> String {
    format!("extension:{}", extension_id)
}

/// The id prefix proving tab ownership.
pub fn tab_id_prefix(extension_id: &str) -> String {
    format!("ext-{}-", extension_id)
}

/// A tab type contributed by an extension
#[derive(Debug, Clone)]
pub struct TabType {
    /// Kind key, `extension:<extensionId>`
    pub kind: String,
    /// Owning extension id
    pub extension_id: String,
    /// Name shown in the UI
    pub display_name: String,
    /// Optional icon reference
    pub icon: Option<String>,
    /// Component reference resolved by the host UI
    pub component: String,
}

/// Options for creating a tab instance
#[derive(Debug, Clone, Default)]
pub struct CreateTabOptions {
    /// Pane to open the tab in
    pub pane_id: Option<String>,
    /// Whether the tab shows a close control (default true)
    pub closable: Option<bool>,
    /// A singleton tab keeps the bare `extension:<id>` path
    pub singleton: bool,
}

/// An open tab instance
#[derive(Debug, Clone)]
pub struct Tab {
    /// Unique id; façade-created tabs carry the `ext-<extensionId>-` prefix
    pub tab_id: String,
    /// Title
    pub name: String,
    /// Tab kind, inherited from the type
    pub kind: String,
    /// Hosting pane
    pub pane_id: Option<String>,
    /// Whether the tab can be closed from the UI
    pub closable: bool,
    /// Free-form tab data
    pub data: Value,
    /// Routing path, `extension:<id>` or `extension:<id>/<tabId>`
    pub path: String,
}

/// Partial update applied to an open tab
#[derive(Debug, Clone, Default)]
pub struct TabUpdate {
    pub name: Option<String>,
    pub pane_id: Option<String>,
    pub closable: Option<bool>,
    pub data: Option<Value>,
}

impl TabType {
    /// Produce a tab instance of this type with a generated id.
    pub fn create_tab(&self, name: impl Into<String>, data: Value, opts: &CreateTabOptions) -> Tab {
        let tab_id = format!(
            "{}{}",
            tab_id_prefix(&self.extension_id),
            Uuid::new_v4().simple()
        );
        let path = if opts.singleton {
            tab_kind(&self.extension_id)
        } else {
            format!("{}/{}", tab_kind(&self.extension_id), tab_id)
        };
        Tab {
            tab_id,
            name: name.into(),
            kind: self.kind.clone(),
            pane_id: opts.pane_id.clone(),
            closable: opts.closable.unwrap_or(true),
            data,
            path,
        }
    }
}

/// Callback invoked when a tab closes
pub type TabCloseCallback = Arc<dyn Fn() + Send + Sync>;

/// Process-wide tab table
#[derive(Default)]
pub struct TabRegistry {
    types: RwLock<Vec<TabType>>,
    tabs: RwLock<Vec<Tab>>,
    active_tab: RwLock<Option<String>>,
    close_callbacks: RwLock<HashMap<String, Vec<TabCloseCallback>>>,
    listeners: ChangeListeners,
}

impl TabRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a tab type.
    pub fn register_type(&self, tab_type: TabType) {
        {
            let mut types = self.types.write().expect("tab table poisoned");
            if let Some(existing) = types.iter_mut().find(|t| t.kind == tab_type.kind) {
                warn!("Tab type '{}' re-registered, overwriting", tab_type.kind);
                *existing = tab_type;
            } else {
                types.push(tab_type);
            }
        }
        self.listeners.notify();
    }

    /// Remove a tab type by kind.
    pub fn unregister_type(&self, kind: &str) -> bool {
        let removed = {
            let mut types = self.types.write().expect("tab table poisoned");
            let before = types.len();
            types.retain(|t| t.kind != kind);
            types.len() != before
        };
        if removed {
            self.listeners.notify();
        }
        removed
    }

    /// All registered tab types, in registration order.
    pub fn types(&self) -> Vec<TabType> {
        self.types.read().expect("tab table poisoned").clone()
    }

    /// Look up a tab type by kind.
    pub fn type_for_kind(&self, kind: &str) -> Option<TabType> {
        self.types
            .read()
            .expect("tab table poisoned")
            .iter()
            .find(|t| t.kind == kind)
            .cloned()
    }

    /// Insert an open tab.
    pub fn insert_tab(&self, tab: Tab) {
        debug!("Tab '{}' opened ({})", tab.tab_id, tab.kind);
        self.tabs.write().expect("tab table poisoned").push(tab);
        self.listeners.notify();
    }

    /// Apply a partial update to an open tab.
    pub fn update_tab(&self, tab_id: &str, update: TabUpdate) -> bool {
        let updated = {
            let mut tabs = self.tabs.write().expect("tab table poisoned");
            match tabs.iter_mut().find(|t| t.tab_id == tab_id) {
                Some(tab) => {
                    if let Some(name) = update.name {
                        tab.name = name;
                    }
                    if let Some(pane_id) = update.pane_id {
                        tab.pane_id = Some(pane_id);
                    }
                    if let Some(closable) = update.closable {
                        tab.closable = closable;
                    }
                    if let Some(data) = update.data {
                        tab.data = data;
                    }
                    true
                }
                None => false,
            }
        };
        if updated {
            self.listeners.notify();
        }
        updated
    }

    /// Close a tab, invoking its close callbacks best-effort.
    pub fn close_tab(&self, tab_id: &str) -> bool {
        let removed = {
            let mut tabs = self.tabs.write().expect("tab table poisoned");
            let before = tabs.len();
            tabs.retain(|t| t.tab_id != tab_id);
            tabs.len() != before
        };
        if !removed {
            return false;
        }

        let callbacks = self
            .close_callbacks
            .write()
            .expect("tab table poisoned")
            .remove(tab_id)
            .unwrap_or_default();
        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
                warn!("Close callback for tab '{}' panicked", tab_id);
            }
        }

        let mut active = self.active_tab.write().expect("tab table poisoned");
        if active.as_deref() == Some(tab_id) {
            *active = None;
        }
        drop(active);

        self.listeners.notify();
        true
    }

    /// Look up one open tab.
    pub fn tab(&self, tab_id: &str) -> Option<Tab> {
        self.tabs
            .read()
            .expect("tab table poisoned")
            .iter()
            .find(|t| t.tab_id == tab_id)
            .cloned()
    }

    /// All open tabs, in open order.
    pub fn tabs(&self) -> Vec<Tab> {
        self.tabs.read().expect("tab table poisoned").clone()
    }

    /// Open tabs owned by an extension (by id prefix).
    pub fn tabs_for_extension(&self, extension_id: &str) -> Vec<Tab> {
        let prefix = tab_id_prefix(extension_id);
        self.tabs
            .read()
            .expect("tab table poisoned")
            .iter()
            .filter(|t| t.tab_id.starts_with(&prefix))
            .cloned()
            .collect()
    }

    /// Find an open tab by kind and `noteKey` data field.
    pub fn find_by_note_key(&self, kind: &str, note_key: &str) -> Option<Tab> {
        self.tabs
            .read()
            .expect("tab table poisoned")
            .iter()
            .find(|t| {
                t.kind == kind && t.data.get("noteKey").and_then(Value::as_str) == Some(note_key)
            })
            .cloned()
    }

    /// Make a tab active.
    pub fn activate(&self, tab_id: &str) -> bool {
        let exists = self
            .tabs
            .read()
            .expect("tab table poisoned")
            .iter()
            .any(|t| t.tab_id == tab_id);
        if !exists {
            return false;
        }
        *self.active_tab.write().expect("tab table poisoned") = Some(tab_id.to_string());
        self.listeners.notify();
        true
    }

    /// The currently active tab id.
    pub fn active_tab(&self) -> Option<String> {
        self.active_tab.read().expect("tab table poisoned").clone()
    }

    /// Register a close callback for a tab.
    pub fn on_close(&self, tab_id: &str, callback: TabCloseCallback) {
        self.close_callbacks
            .write()
            .expect("tab table poisoned")
            .entry(tab_id.to_string())
            .or_default()
            .push(callback);
    }

    /// Remove everything owned by an extension: its type and its open tabs.
    ///
    /// Close callbacks of removed tabs are invoked best-effort.
    pub fn unregister_all(&self, extension_id: &str) {
        let owned: Vec<String> = self
            .tabs_for_extension(extension_id)
            .into_iter()
            .map(|t| t.tab_id)
            .collect();
        for tab_id in owned {
            self.close_tab(&tab_id);
        }
        self.unregister_type(&tab_kind(extension_id));
    }

    /// Subscribe to mutations.
    pub fn subscribe(&self, listener: Arc<dyn Fn() + Send + Sync>) -> ListenerHandle {
        self.listeners.subscribe(listener)
    }

    /// Remove a change listener.
    pub fn unsubscribe(&self, handle: ListenerHandle) {
        self.listeners.unsubscribe(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample_type(extension_id: &str) -> TabType {
        TabType {
            kind: tab_kind(extension_id),
            extension_id: extension_id.to_string(),
            display_name: "Sample".to_string(),
            icon: None,
            component: "SampleView".to_string(),
        }
    }

    #[test]
    fn test_create_tab_id_and_path() {
        let tab_type = sample_type("a.notes");
        let tab = tab_type.create_tab("Note", json!({}), &CreateTabOptions::default());
        assert!(tab.tab_id.starts_with("ext-a.notes-"));
        assert_eq!(tab.kind, "extension:a.notes");
        assert_eq!(tab.path, format!("extension:a.notes/{}", tab.tab_id));

        let singleton = tab_type.create_tab(
            "Note",
            json!({}),
            &CreateTabOptions {
                singleton: true,
                ..Default::default()
            },
        );
        assert_eq!(singleton.path, "extension:a.notes");
    }

    #[test]
    fn test_update_and_close() {
        let registry = TabRegistry::new();
        let tab = sample_type("a.notes").create_tab("One", json!({}), &Default::default());
        let tab_id = tab.tab_id.clone();
        registry.insert_tab(tab);

        assert!(registry.update_tab(
            &tab_id,
            TabUpdate {
                name: Some("Renamed".to_string()),
                ..Default::default()
            }
        ));
        assert_eq!(registry.tab(&tab_id).unwrap().name, "Renamed");

        let closed = Arc::new(AtomicUsize::new(0));
        let closed_clone = closed.clone();
        registry.on_close(&tab_id, Arc::new(move || {
            closed_clone.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(registry.close_tab(&tab_id));
        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert!(registry.tab(&tab_id).is_none());
        assert!(!registry.close_tab(&tab_id));
    }

    #[test]
    fn test_find_by_note_key() {
        let registry = TabRegistry::new();
        let tab_type = sample_type("a.notes");
        registry.insert_tab(tab_type.create_tab(
            "One",
            json!({"noteKey": "k1"}),
            &Default::default(),
        ));

        assert!(registry.find_by_note_key("extension:a.notes", "k1").is_some());
        assert!(registry.find_by_note_key("extension:a.notes", "k2").is_none());
        assert!(registry.find_by_note_key("extension:b.other", "k1").is_none());
    }

    #[test]
    fn test_unregister_all_leaves_other_extensions() {
        let registry = TabRegistry::new();
        registry.register_type(sample_type("a.notes"));
        registry.register_type(sample_type("b.other"));
        registry.insert_tab(sample_type("a.notes").create_tab("A", json!({}), &Default::default()));
        registry.insert_tab(sample_type("b.other").create_tab("B", json!({}), &Default::default()));

        registry.unregister_all("a.notes");

        assert!(registry.type_for_kind("extension:a.notes").is_none());
        assert!(registry.type_for_kind("extension:b.other").is_some());
        assert!(registry.tabs_for_extension("a.notes").is_empty());
        assert_eq!(registry.tabs_for_extension("b.other").len(), 1);
    }

    #[test]
    fn test_listeners_fire_on_mutation() {
        let registry = TabRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        registry.subscribe(Arc::new(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        }));

        registry.register_type(sample_type("a.notes"));
        registry.insert_tab(sample_type("a.notes").create_tab("A", json!({}), &Default::default()));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}

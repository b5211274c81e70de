//! Sidebar panel registry
//!
//! Panels are keyed by `<extensionId>.<panelId>`. Besides the shared
//! change-listener set, each panel can carry activation listeners the host
//! invokes when it switches to the panel; a listener failure is logged and
//! never propagated.

use super::{ChangeListeners, DEFAULT_ORDER, ListenerHandle};
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, RwLock};
use tracing::warn;

/// Definition of a sidebar panel
#[derive(Debug, Clone)]
pub struct SidebarPanelDef {
    /// Panel title
    pub title: String,
    /// Optional icon reference
    pub icon: Option<String>,
    /// Component reference resolved by the host UI
    pub component: String,
    /// Sort order; lower comes first
    pub order: Option<i32>,
}

/// A registered sidebar panel
#[derive(Debug, Clone)]
pub struct SidebarPanel {
    /// `<extensionId>.<panelId>`
    pub full_id: String,
    /// Owning extension id
    pub extension_id: String,
    /// Panel definition
    pub definition: SidebarPanelDef,
    /// Free-form panel state
    pub state: Value,
}

/// Listener invoked when the host switches to a panel
pub type PanelActivationListener = Arc<dyn Fn() + Send + Sync>;

/// Process-wide sidebar panel table
#[derive(Default)]
pub struct SidebarRegistry {
    panels: RwLock<Vec<SidebarPanel>>,
    activation_listeners: RwLock<HashMap<String, Vec<PanelActivationListener>>>,
    listeners: ChangeListeners,
}

impl SidebarRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a panel; returns its full id.
    pub fn register(
        &self,
        extension_id: &str,
        panel_id: &str,
        definition: SidebarPanelDef,
    ) -> String {
        let full_id = format!("{}.{}", extension_id, panel_id);
        {
            let mut panels = self.panels.write().expect("sidebar table poisoned");
            if let Some(existing) = panels.iter_mut().find(|p| p.full_id == full_id) {
                warn!("Sidebar panel '{}' re-registered, overwriting", full_id);
                existing.definition = definition;
            } else {
                panels.push(SidebarPanel {
                    full_id: full_id.clone(),
                    extension_id: extension_id.to_string(),
                    definition,
                    state: Value::Null,
                });
            }
        }
        self.listeners.notify();
        full_id
    }

    /// Remove one panel.
    pub fn unregister(&self, extension_id: &str, panel_id: &str) -> bool {
        let full_id = format!("{}.{}", extension_id, panel_id);
        let removed = {
            let mut panels = self.panels.write().expect("sidebar table poisoned");
            let before = panels.len();
            panels.retain(|p| p.full_id != full_id);
            panels.len() != before
        };
        if removed {
            self.activation_listeners
                .write()
                .expect("sidebar table poisoned")
                .remove(&full_id);
            self.listeners.notify();
        }
        removed
    }

    /// Remove every panel owned by an extension.
    pub fn unregister_all(&self, extension_id: &str) {
        let removed: Vec<String> = {
            let mut panels = self.panels.write().expect("sidebar table poisoned");
            let (gone, kept): (Vec<_>, Vec<_>) = panels
                .drain(..)
                .partition(|p| p.extension_id == extension_id);
            *panels = kept;
            gone.into_iter().map(|p| p.full_id).collect()
        };
        if removed.is_empty() {
            return;
        }
        let mut activation = self
            .activation_listeners
            .write()
            .expect("sidebar table poisoned");
        for full_id in &removed {
            activation.remove(full_id);
        }
        drop(activation);
        self.listeners.notify();
    }

    /// All panels, sorted by order (default 100) then insertion.
    pub fn panels(&self) -> Vec<SidebarPanel> {
        let mut panels = self.panels.read().expect("sidebar table poisoned").clone();
        panels.sort_by_key(|p| p.definition.order.unwrap_or(DEFAULT_ORDER));
        panels
    }

    /// Look up one panel.
    pub fn panel(&self, full_id: &str) -> Option<SidebarPanel> {
        self.panels
            .read()
            .expect("sidebar table poisoned")
            .iter()
            .find(|p| p.full_id == full_id)
            .cloned()
    }

    /// Replace a panel's state.
    pub fn set_state(&self, full_id: &str, state: Value) -> bool {
        let updated = {
            let mut panels = self.panels.write().expect("sidebar table poisoned");
            match panels.iter_mut().find(|p| p.full_id == full_id) {
                Some(panel) => {
                    panel.state = state;
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

    /// Add an activation listener for a panel.
    pub fn on_panel_activate(&self, full_id: &str, listener: PanelActivationListener) {
        self.activation_listeners
            .write()
            .expect("sidebar table poisoned")
            .entry(full_id.to_string())
            .or_default()
            .push(listener);
    }

    /// Invoked by the host when it switches to a panel.
    ///
    /// Listener failures are caught and logged, never propagated.
    pub fn activate_panel(&self, full_id: &str) {
        let listeners: Vec<_> = self
            .activation_listeners
            .read()
            .expect("sidebar table poisoned")
            .get(full_id)
            .cloned()
            .unwrap_or_default();
        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener())).is_err() {
                warn!("Activation listener for panel '{}' panicked", full_id);
            }
        }
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
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn def(title: &str, order: Option<i32>) -> SidebarPanelDef {
        SidebarPanelDef {
            title: title.to_string(),
            icon: None,
            component: "Panel".to_string(),
            order,
        }
    }

    #[test]
    fn test_register_returns_full_id() {
        let registry = SidebarRegistry::new();
        let full_id = registry.register("a.notes", "outline", def("Outline", None));
        assert_eq!(full_id, "a.notes.outline");
        assert!(registry.panel("a.notes.outline").is_some());
    }

    #[test]
    fn test_panels_sorted_by_order_then_insertion() {
        let registry = SidebarRegistry::new();
        registry.register("a.one", "p", def("First", None));
        registry.register("a.two", "p", def("Early", Some(10)));
        registry.register("a.three", "p", def("AlsoDefault", None));

        let titles: Vec<_> = registry
            .panels()
            .into_iter()
            .map(|p| p.definition.title)
            .collect();
        assert_eq!(titles, vec!["Early", "First", "AlsoDefault"]);
    }

    #[test]
    fn test_activation_listener_panic_contained() {
        let registry = SidebarRegistry::new();
        let full_id = registry.register("a.notes", "outline", def("Outline", None));

        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        registry.on_panel_activate(&full_id, Arc::new(|| panic!("listener bug")));
        registry.on_panel_activate(&full_id, Arc::new(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        }));

        registry.activate_panel(&full_id);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unregister_all() {
        let registry = SidebarRegistry::new();
        registry.register("a.notes", "one", def("One", None));
        registry.register("a.notes", "two", def("Two", None));
        registry.register("b.other", "keep", def("Keep", None));

        registry.unregister_all("a.notes");
        let panels = registry.panels();
        assert_eq!(panels.len(), 1);
        assert_eq!(panels[0].full_id, "b.other.keep");
    }
}

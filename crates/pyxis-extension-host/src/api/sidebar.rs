//! Sidebar façade
//!
//! Panel ids are local to the extension; the façade derives the full
//! `<extensionId>.<panelId>` key, so an extension can only ever address its
//! own panels.

use crate::registries::sidebar::{PanelActivationListener, SidebarPanelDef, SidebarRegistry};
use serde_json::Value;
use std::sync::Arc;

/// Per-extension sidebar capability
#[derive(Clone)]
pub struct SidebarApi {
    extension_id: String,
    registry: Arc<SidebarRegistry>,
}

impl SidebarApi {
    /// Create a façade bound to one extension.
    pub fn new(extension_id: impl Into<String>, registry: Arc<SidebarRegistry>) -> Self {
        Self {
            extension_id: extension_id.into(),
            registry,
        }
    }

    /// The owning extension id.
    pub fn extension_id(&self) -> &str {
        &self.extension_id
    }

    /// Register a panel; returns its full id.
    pub fn register_panel(&self, panel_id: &str, definition: SidebarPanelDef) -> String {
        self.registry
            .register(&self.extension_id, panel_id, definition)
    }

    /// Remove one of this extension's panels.
    pub fn unregister_panel(&self, panel_id: &str) -> bool {
        self.registry.unregister(&self.extension_id, panel_id)
    }

    /// Replace the state of one of this extension's panels.
    pub fn set_panel_state(&self, panel_id: &str, state: Value) -> bool {
        let full_id = format!("{}.{}", self.extension_id, panel_id);
        self.registry.set_state(&full_id, state)
    }

    /// Listen for the host switching to one of this extension's panels.
    pub fn on_panel_activate(&self, panel_id: &str, listener: PanelActivationListener) {
        let full_id = format!("{}.{}", self.extension_id, panel_id);
        self.registry.on_panel_activate(&full_id, listener);
    }

    /// Remove every panel this extension registered.
    pub fn dispose(&self) {
        self.registry.unregister_all(&self.extension_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(title: &str) -> SidebarPanelDef {
        SidebarPanelDef {
            title: title.to_string(),
            icon: None,
            component: "Panel".to_string(),
            order: None,
        }
    }

    #[test]
    fn test_register_scopes_to_extension() {
        let registry = Arc::new(SidebarRegistry::new());
        let sidebar = SidebarApi::new("a.notes", registry.clone());

        let full_id = sidebar.register_panel("outline", def("Outline"));
        assert_eq!(full_id, "a.notes.outline");
        assert!(sidebar.set_panel_state("outline", serde_json::json!({"open": true})));
        assert!(sidebar.unregister_panel("outline"));
        assert!(registry.panels().is_empty());
    }

    #[test]
    fn test_dispose_spares_other_extensions() {
        let registry = Arc::new(SidebarRegistry::new());
        let a = SidebarApi::new("a.notes", registry.clone());
        let b = SidebarApi::new("b.other", registry.clone());
        a.register_panel("one", def("One"));
        b.register_panel("two", def("Two"));

        a.dispose();
        let panels = registry.panels();
        assert_eq!(panels.len(), 1);
        assert_eq!(panels[0].extension_id, "b.other");
    }
}

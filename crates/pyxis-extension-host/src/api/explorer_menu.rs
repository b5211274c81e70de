//! Explorer menu façade

use crate::registries::explorer_menu::{ExplorerMenuItemDef, ExplorerMenuRegistry};
use std::sync::Arc;

/// Per-extension explorer context-menu capability
#[derive(Clone)]
pub struct ExplorerMenuApi {
    extension_id: String,
    registry: Arc<ExplorerMenuRegistry>,
}

impl ExplorerMenuApi {
    /// Create a façade bound to one extension.
    pub fn new(extension_id: impl Into<String>, registry: Arc<ExplorerMenuRegistry>) -> Self {
        Self {
            extension_id: extension_id.into(),
            registry,
        }
    }

    /// The owning extension id.
    pub fn extension_id(&self) -> &str {
        &self.extension_id
    }

    /// Register a menu item; returns its full id.
    pub fn register_item(&self, item_id: &str, definition: ExplorerMenuItemDef) -> String {
        self.registry
            .register(&self.extension_id, item_id, definition)
    }

    /// Remove one of this extension's menu items.
    pub fn unregister_item(&self, item_id: &str) -> bool {
        self.registry.unregister(&self.extension_id, item_id)
    }

    /// Remove every menu item this extension registered.
    pub fn dispose(&self) {
        self.registry.unregister_all(&self.extension_id);
    }
}

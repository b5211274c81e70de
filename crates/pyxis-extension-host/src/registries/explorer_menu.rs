//! Explorer context-menu registry
//!
//! Menu items are keyed by `<extensionId>.<itemId>` and filtered per file
//! item: by file/folder target, by byte-backed content, and by
//! case-insensitive file extension.

use super::{ChangeListeners, DEFAULT_ORDER, ListenerHandle};
use pyxis_extension_sdk::error::Result;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use tracing::warn;

/// What kind of explorer item a menu entry applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MenuTarget {
    /// Files only
    File,
    /// Folders only
    Folder,
    /// Both files and folders
    #[default]
    Both,
}

/// An explorer item a menu is opened on
#[derive(Debug, Clone)]
pub struct ExplorerItem {
    /// Full path
    pub path: String,
    /// Display name (last path segment)
    pub name: String,
    /// Whether the item is a folder
    pub is_directory: bool,
    /// Whether the item is backed by bytes (binary content)
    pub has_bytes: bool,
}

/// Boxed async menu handler
pub type MenuHandler = Arc<
    dyn Fn(ExplorerItem) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send + Sync,
>;

/// Wrap an async closure as a [`MenuHandler`].
pub fn menu_handler_fn<F, Fut>(f: F) -> MenuHandler
where
    F: Fn(ExplorerItem) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |item| Box::pin(f(item)))
}

/// Definition of an explorer menu item
#[derive(Clone)]
pub struct ExplorerMenuItemDef {
    /// Label shown in the menu
    pub label: String,
    /// Optional icon reference
    pub icon: Option<String>,
    /// Target filter
    pub when: MenuTarget,
    /// Case-insensitive extension filter (applies to files)
    pub file_extensions: Option<Vec<String>>,
    /// Require byte-backed items
    pub binary_only: bool,
    /// Sort order; lower comes first
    pub order: Option<i32>,
    /// Invoked when the item is selected
    pub handler: MenuHandler,
}

/// A registered explorer menu item
#[derive(Clone)]
pub struct ExplorerMenuItem {
    /// `<extensionId>.<itemId>`
    pub full_id: String,
    /// Owning extension id
    pub extension_id: String,
    /// Item definition
    pub definition: ExplorerMenuItemDef,
}

/// Process-wide explorer menu table
#[derive(Default)]
pub struct ExplorerMenuRegistry {
    items: RwLock<Vec<ExplorerMenuItem>>,
    listeners: ChangeListeners,
}

/// The lowercase extension of a file name, honoring the exclusion rules:
/// names with no dot, or with only a leading dot, have no extension.
fn file_extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

impl ExplorerMenuRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a menu item; returns its full id.
    pub fn register(
        &self,
        extension_id: &str,
        item_id: &str,
        definition: ExplorerMenuItemDef,
    ) -> String {
        let full_id = format!("{}.{}", extension_id, item_id);
        {
            let mut items = self.items.write().expect("menu table poisoned");
            if let Some(existing) = items.iter_mut().find(|i| i.full_id == full_id) {
                warn!("Explorer menu item '{}' re-registered, overwriting", full_id);
                existing.definition = definition;
            } else {
                items.push(ExplorerMenuItem {
                    full_id: full_id.clone(),
                    extension_id: extension_id.to_string(),
                    definition,
                });
            }
        }
        self.listeners.notify();
        full_id
    }

    /// Remove one menu item.
    pub fn unregister(&self, extension_id: &str, item_id: &str) -> bool {
        let full_id = format!("{}.{}", extension_id, item_id);
        let removed = {
            let mut items = self.items.write().expect("menu table poisoned");
            let before = items.len();
            items.retain(|i| i.full_id != full_id);
            items.len() != before
        };
        if removed {
            self.listeners.notify();
        }
        removed
    }

    /// Remove every menu item owned by an extension.
    pub fn unregister_all(&self, extension_id: &str) {
        let removed = {
            let mut items = self.items.write().expect("menu table poisoned");
            let before = items.len();
            items.retain(|i| i.extension_id != extension_id);
            items.len() != before
        };
        if removed {
            self.listeners.notify();
        }
    }

    /// All menu items, sorted by order (default 100) then insertion.
    pub fn items(&self) -> Vec<ExplorerMenuItem> {
        let mut items = self.items.read().expect("menu table poisoned").clone();
        items.sort_by_key(|i| i.definition.order.unwrap_or(DEFAULT_ORDER));
        items
    }

    /// Menu items applicable to a given explorer item, sorted.
    pub fn items_for(&self, item: &ExplorerItem) -> Vec<ExplorerMenuItem> {
        self.items()
            .into_iter()
            .filter(|entry| {
                let def = &entry.definition;
                match def.when {
                    MenuTarget::File if item.is_directory => return false,
                    MenuTarget::Folder if !item.is_directory => return false,
                    _ => {}
                }
                if def.binary_only && !item.has_bytes {
                    return false;
                }
                if let Some(extensions) = &def.file_extensions {
                    if !item.is_directory {
                        let Some(ext) = file_extension(&item.name) else {
                            return false;
                        };
                        let matched = extensions
                            .iter()
                            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(&ext));
                        if !matched {
                            return false;
                        }
                    }
                }
                true
            })
            .collect()
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

    fn def(when: MenuTarget) -> ExplorerMenuItemDef {
        ExplorerMenuItemDef {
            label: "Open".to_string(),
            icon: None,
            when,
            file_extensions: None,
            binary_only: false,
            order: None,
            handler: menu_handler_fn(|_| async { Ok(()) }),
        }
    }

    fn file(name: &str, has_bytes: bool) -> ExplorerItem {
        ExplorerItem {
            path: format!("/project/{}", name),
            name: name.to_string(),
            is_directory: false,
            has_bytes,
        }
    }

    fn folder(name: &str) -> ExplorerItem {
        ExplorerItem {
            path: format!("/project/{}", name),
            name: name.to_string(),
            is_directory: true,
            has_bytes: false,
        }
    }

    #[test]
    fn test_target_filtering() {
        let registry = ExplorerMenuRegistry::new();
        registry.register("a.x", "file-only", def(MenuTarget::File));
        registry.register("a.x", "folder-only", def(MenuTarget::Folder));
        registry.register("a.x", "both", def(MenuTarget::Both));

        let for_file = registry.items_for(&file("readme.md", false));
        assert_eq!(for_file.len(), 2);
        let for_folder = registry.items_for(&folder("src"));
        assert_eq!(for_folder.len(), 2);
    }

    #[test]
    fn test_extension_filtering_case_insensitive() {
        let registry = ExplorerMenuRegistry::new();
        let mut item = def(MenuTarget::File);
        item.file_extensions = Some(vec![".PNG".to_string(), "jpg".to_string()]);
        registry.register("a.x", "images", item);

        assert_eq!(registry.items_for(&file("photo.png", true)).len(), 1);
        assert_eq!(registry.items_for(&file("photo.JPG", true)).len(), 1);
        assert_eq!(registry.items_for(&file("notes.txt", false)).len(), 0);
        // No dot and leading-only dot are excluded
        assert_eq!(registry.items_for(&file("Makefile", false)).len(), 0);
        assert_eq!(registry.items_for(&file(".png", false)).len(), 0);
    }

    #[test]
    fn test_binary_only() {
        let registry = ExplorerMenuRegistry::new();
        let mut item = def(MenuTarget::File);
        item.binary_only = true;
        registry.register("a.x", "hex", item);

        assert_eq!(registry.items_for(&file("img.png", true)).len(), 1);
        assert_eq!(registry.items_for(&file("text.md", false)).len(), 0);
    }

    #[test]
    fn test_ordering() {
        let registry = ExplorerMenuRegistry::new();
        let mut late = def(MenuTarget::Both);
        late.label = "Late".to_string();
        late.order = Some(200);
        let mut early = def(MenuTarget::Both);
        early.label = "Early".to_string();
        early.order = Some(1);

        registry.register("a.x", "late", late);
        registry.register("a.x", "early", early);

        let labels: Vec<_> = registry
            .items()
            .into_iter()
            .map(|i| i.definition.label)
            .collect();
        assert_eq!(labels, vec!["Early", "Late"]);
    }
}

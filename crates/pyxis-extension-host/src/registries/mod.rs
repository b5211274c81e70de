//! Process-wide capability registries
//!
//! Tabs, sidebar panels, explorer context-menu items and terminal commands
//! registered by extensions all land in one of these shared tables. The
//! tables are mutated only through the per-extension API façades; the host
//! UI reads them through getters and change listeners. All registries share
//! the same shape: entries keyed by `<extensionId>.<localId>` (tab kinds use
//! `extension:<extensionId>`), per-extension bulk removal, and listeners
//! notified on every mutation with panics isolated per listener.

pub mod commands;
pub mod explorer_menu;
pub mod sidebar;
pub mod tabs;

pub use commands::{CommandContext, CommandHandler, CommandInfo, CommandRegistry, command_fn};
pub use explorer_menu::{
    ExplorerItem, ExplorerMenuItem, ExplorerMenuItemDef, ExplorerMenuRegistry, MenuHandler,
    MenuTarget, menu_handler_fn,
};
pub use sidebar::{PanelActivationListener, SidebarPanel, SidebarPanelDef, SidebarRegistry};
pub use tabs::{CreateTabOptions, Tab, TabRegistry, TabType, TabUpdate, tab_id_prefix, tab_kind};

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::warn;

/// Sort order applied to registrations that do not specify one
pub const DEFAULT_ORDER: i32 = 100;

/// Handle identifying a registered change listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerHandle(u64);

/// Change-listener set shared by the capability registries
#[derive(Default)]
pub(crate) struct ChangeListeners {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(u64, Arc<dyn Fn() + Send + Sync>)>>,
}

impl ChangeListeners {
    pub(crate) fn subscribe(&self, listener: Arc<dyn Fn() + Send + Sync>) -> ListenerHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.listeners
            .write()
            .expect("listener set poisoned")
            .push((id, listener));
        ListenerHandle(id)
    }

    pub(crate) fn unsubscribe(&self, handle: ListenerHandle) {
        self.listeners
            .write()
            .expect("listener set poisoned")
            .retain(|(id, _)| *id != handle.0);
    }

    /// Invoke every listener, isolating panics so the rest still fire.
    pub(crate) fn notify(&self) {
        let listeners: Vec<_> = self
            .listeners
            .read()
            .expect("listener set poisoned")
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener())).is_err() {
                warn!("Registry change listener panicked");
            }
        }
    }
}

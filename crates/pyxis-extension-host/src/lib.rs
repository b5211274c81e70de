//! Pyxis Extension Host
//!
//! The extension runtime of the Pyxis IDE: a sandboxed plugin loader that
//! fetches extension packages (registry + HTTP, or uploaded ZIP), evaluates
//! their entry modules through a pluggable script host, hands each one a
//! capability-scoped context, and manages the install → enable → active →
//! disable → uninstall lifecycle.
//!
//! Key pieces:
//! - [`manager::ExtensionManager`] — lifecycle orchestration, `onlyOne`
//!   conflict resolution, change events, aggregation of language packs and
//!   built-in modules.
//! - [`registries`] — process-wide tables for tabs, sidebar panels, explorer
//!   menu items and terminal commands, mutated only through per-extension
//!   façades ([`api`]).
//! - [`loader`] — import rewriting plus module-URL evaluation behind the
//!   [`loader::ScriptHost`] trait.
//! - [`store`] — durable per-id records with binary assets persisted as byte
//!   containers.
//! - [`fetch`] — registry catalog with TTL cache, HTTP package fetch, ZIP
//!   ingestion.
//! - [`autoinstall`] — first-run defaults and locale-matched language pack.

pub mod api;
pub mod autoinstall;
pub mod binary;
pub mod config;
pub mod context;
pub mod fetch;
pub mod loader;
pub mod manager;
pub mod output;
pub mod registries;
pub mod rewrite;
pub mod store;

pub use config::RuntimeConfig;
pub use context::{ContextRegistries, ExtensionContext, SystemModule, SystemModules};
pub use loader::{
    ExtensionExports, ModuleLoader, ModuleNamespace, ScriptHost, StaticScriptHost, activate_fn,
    deactivate_fn,
};
pub use manager::{
    ActiveExtension, ExtensionEvent, ExtensionEventKind, ExtensionManager,
    ExtensionManagerBuilder,
};
pub use output::{EXTENSIONS_CHANNEL, LogSeverity, OutputChannel};
pub use store::{ExtensionStore, FsStore, MemoryStore};

// The SDK is the shared contract; re-export it for embedders.
pub use pyxis_extension_sdk as sdk;

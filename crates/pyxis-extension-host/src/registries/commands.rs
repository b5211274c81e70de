//! Process-wide table of extension-registered terminal commands
//!
//! Command names are global across extensions; a colliding registration
//! overwrites the previous owner with a warning. `execute` is the one API in
//! the runtime that propagates its error to the caller.

use crate::context::ExtensionContext;
use pyxis_extension_sdk::error::{ExtensionError, Result};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Context handed to a command handler at execution time
///
/// Carries the caller-supplied project/cwd keys plus the owning extension's
/// context so handlers can reach `getSystemModule`. Caller-supplied keys win
/// on conflict; the extension context only fills the `extension` slot.
#[derive(Clone, Default)]
pub struct CommandContext {
    /// Active project name
    pub project_name: Option<String>,
    /// Active project id
    pub project_id: Option<String>,
    /// Current working directory
    pub current_dir: Option<String>,
    /// Free-form caller keys
    pub extra: HashMap<String, serde_json::Value>,
    /// The owning extension's context, filled by the registration wrapper
    pub extension: Option<ExtensionContext>,
}

/// Boxed async command handler
pub type CommandHandler = Arc<
    dyn Fn(Vec<String>, CommandContext) -> Pin<Box<dyn Future<Output = Result<String>> + Send>>
        + Send
        + Sync,
>;

/// Wrap an async closure as a [`CommandHandler`].
pub fn command_fn<F, Fut>(f: F) -> CommandHandler
where
    F: Fn(Vec<String>, CommandContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String>> + Send + 'static,
{
    Arc::new(move |args, ctx| Box::pin(f(args, ctx)))
}

/// Introspection record for a registered command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInfo {
    /// Command name
    pub name: String,
    /// Owning extension id
    pub extension_id: String,
}

#[derive(Clone)]
struct CommandEntry {
    extension_id: String,
    handler: CommandHandler,
}

/// Process-wide command table
#[derive(Default)]
pub struct CommandRegistry {
    entries: RwLock<HashMap<String, CommandEntry>>,
}

impl CommandRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command; returns a function that unregisters it again.
    pub fn register(
        self: &Arc<Self>,
        extension_id: impl Into<String>,
        name: impl Into<String>,
        handler: CommandHandler,
    ) -> Box<dyn FnOnce() + Send> {
        let extension_id = extension_id.into();
        let name = name.into();
        {
            let mut entries = self.entries.write().expect("command table poisoned");
            if let Some(existing) = entries.get(&name) {
                warn!(
                    "Command '{}' re-registered by {}, overwriting {}",
                    name, extension_id, existing.extension_id
                );
            }
            entries.insert(
                name.clone(),
                CommandEntry {
                    extension_id: extension_id.clone(),
                    handler,
                },
            );
        }
        debug!("Command '{}' registered by {}", name, extension_id);

        let registry = Arc::clone(self);
        Box::new(move || {
            registry.unregister(&name);
        })
    }

    /// Remove one command.
    pub fn unregister(&self, name: &str) -> bool {
        self.entries
            .write()
            .expect("command table poisoned")
            .remove(name)
            .is_some()
    }

    /// Remove every command owned by an extension.
    pub fn unregister_all(&self, extension_id: &str) {
        self.entries
            .write()
            .expect("command table poisoned")
            .retain(|_, entry| entry.extension_id != extension_id);
    }

    /// Whether a command is registered.
    pub fn has(&self, name: &str) -> bool {
        self.entries
            .read()
            .expect("command table poisoned")
            .contains_key(name)
    }

    /// Registered command names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .entries
            .read()
            .expect("command table poisoned")
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Introspection record for one command.
    pub fn describe(&self, name: &str) -> Option<CommandInfo> {
        self.entries
            .read()
            .expect("command table poisoned")
            .get(name)
            .map(|entry| CommandInfo {
                name: name.to_string(),
                extension_id: entry.extension_id.clone(),
            })
    }

    /// Execute a command. Errors (including unknown commands) propagate.
    pub async fn execute(
        &self,
        name: &str,
        args: Vec<String>,
        context: CommandContext,
    ) -> Result<String> {
        let handler = {
            let entries = self.entries.read().expect("command table poisoned");
            entries
                .get(name)
                .map(|entry| entry.handler.clone())
                .ok_or_else(|| ExtensionError::CommandNotFound(name.to_string()))?
        };
        handler(args, context).await
    }
}

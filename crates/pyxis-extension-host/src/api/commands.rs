//! Commands façade
//!
//! Registration goes through the process-wide [`CommandRegistry`], with the
//! handler wrapped so the context seen at execution time carries the owning
//! extension's [`ExtensionContext`]. Caller-supplied context keys win; the
//! wrapper only fills the `extension` slot when the caller left it empty.

use crate::context::ExtensionContext;
use crate::registries::commands::{CommandHandler, CommandRegistry};
use std::sync::{Arc, OnceLock};
use tracing::warn;

/// Per-extension command capability
#[derive(Clone)]
pub struct CommandsApi {
    extension_id: String,
    registry: Arc<CommandRegistry>,
    // The context does not exist yet when the façade is built; the builder
    // fills this cell once construction completes.
    context: Arc<OnceLock<ExtensionContext>>,
}

impl CommandsApi {
    /// Create a façade bound to one extension.
    pub fn new(extension_id: impl Into<String>, registry: Arc<CommandRegistry>) -> Self {
        Self {
            extension_id: extension_id.into(),
            registry,
            context: Arc::new(OnceLock::new()),
        }
    }

    /// The owning extension id.
    pub fn extension_id(&self) -> &str {
        &self.extension_id
    }

    /// Attach the built context so wrapped handlers can reach it.
    pub(crate) fn attach_context(&self, context: ExtensionContext) {
        if self.context.set(context).is_err() {
            warn!(
                "Extension context for {} attached more than once",
                self.extension_id
            );
        }
    }

    /// Register a command; returns a function that unregisters it again.
    pub fn register(&self, name: &str, handler: CommandHandler) -> Box<dyn FnOnce() + Send> {
        let context = self.context.clone();
        let wrapped: CommandHandler = Arc::new(move |args, mut ctx| {
            if ctx.extension.is_none() {
                ctx.extension = context.get().cloned();
            }
            handler(args, ctx)
        });
        self.registry.register(&self.extension_id, name, wrapped)
    }

    /// Remove one command by name.
    pub fn unregister(&self, name: &str) -> bool {
        self.registry.unregister(name)
    }

    /// Remove every command this extension registered.
    pub fn dispose(&self) {
        self.registry.unregister_all(&self.extension_id);
    }
}

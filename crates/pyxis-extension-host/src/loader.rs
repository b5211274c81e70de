//! Module loading via dynamic evaluation
//!
//! Entry code is rewritten for host-provided imports, materialized behind a
//! temporary module URL, imported, and validated to expose a callable
//! `activate`. The URL is owned by the loader for the duration of the import
//! and revoked on both the success and failure paths; extension code never
//! sees it. The activation context is not passed through the URL either —
//! extensions receive it via the subsequent `activate(context)` call.
//!
//! Evaluation itself is delegated to a [`ScriptHost`]: in the browser
//! deployment that is the page's ES-module evaluator; [`StaticScriptHost`]
//! is an in-process table keyed by module source for tests and embedded
//! hosts.

use crate::context::ExtensionContext;
use crate::rewrite::rewrite_host_imports;
use async_trait::async_trait;
use pyxis_extension_sdk::activation::ExtensionActivation;
use pyxis_extension_sdk::error::{ExtensionError, Result};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use tracing::debug;
use uuid::Uuid;

/// A temporary URL naming a materialized module
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleUrl(String);

impl ModuleUrl {
    /// Mint a fresh unique URL.
    pub fn generate() -> Self {
        Self(format!("blob:pyxis/{}", Uuid::new_v4()))
    }

    /// The URL string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Boxed async `activate` callable exported by a module
pub type ActivateFn = Arc<
    dyn Fn(ExtensionContext) -> Pin<Box<dyn Future<Output = Result<ExtensionActivation>> + Send>>
        + Send
        + Sync,
>;

/// Boxed async `deactivate` callable exported by a module
pub type DeactivateFn =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send + Sync>;

/// Wrap an async closure as an [`ActivateFn`].
pub fn activate_fn<F, Fut>(f: F) -> ActivateFn
where
    F: Fn(ExtensionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ExtensionActivation>> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}

/// Wrap an async closure as a [`DeactivateFn`].
pub fn deactivate_fn<F, Fut>(f: F) -> DeactivateFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move || Box::pin(f()))
}

/// Raw export table produced by evaluating a module
#[derive(Clone, Default)]
pub struct ModuleNamespace {
    /// The `activate` export, if present
    pub activate: Option<ActivateFn>,
    /// The `deactivate` export, if present
    pub deactivate: Option<DeactivateFn>,
}

/// Validated exports of an extension entry module
#[derive(Clone)]
pub struct ExtensionExports {
    /// Required activation hook
    pub activate: ActivateFn,
    /// Optional deactivation hook
    pub deactivate: Option<DeactivateFn>,
}

/// Evaluates module source handed over as temporary URLs
#[async_trait]
pub trait ScriptHost: Send + Sync {
    /// Materialize module code behind a fresh URL.
    fn create_module_url(&self, code: &str) -> ModuleUrl;

    /// Import the module at `url` and surface its export table.
    async fn import_module(&self, url: &ModuleUrl) -> Result<ModuleNamespace>;

    /// Release a URL created by [`Self::create_module_url`].
    fn revoke_module_url(&self, url: &ModuleUrl);
}

/// Loads entry code into validated extension exports
pub struct ModuleLoader {
    host: Arc<dyn ScriptHost>,
}

impl ModuleLoader {
    /// Create a loader over the given script host.
    pub fn new(host: Arc<dyn ScriptHost>) -> Self {
        Self { host }
    }

    /// Rewrite, evaluate and validate an entry module.
    pub async fn load(&self, extension_id: &str, entry_code: &str) -> Result<ExtensionExports> {
        let rewritten = rewrite_host_imports(entry_code);
        let url = self.host.create_module_url(&rewritten);
        debug!("Importing module for {} at {}", extension_id, url.as_str());

        let imported = self.host.import_module(&url).await;
        self.host.revoke_module_url(&url);

        let namespace = imported?;
        let activate = namespace
            .activate
            .ok_or_else(|| ExtensionError::MissingActivate(extension_id.to_string()))?;

        Ok(ExtensionExports {
            activate,
            deactivate: namespace.deactivate,
        })
    }
}

/// In-process script host keyed by exact module source
///
/// Modules are registered up front; "importing" looks the evaluated source
/// up in the table. Registration keys are matched against the code after
/// import rewriting, so sources containing host-module imports must be
/// registered in rewritten form.
#[derive(Default)]
pub struct StaticScriptHost {
    modules: RwLock<HashMap<String, ModuleNamespace>>,
    urls: RwLock<HashMap<ModuleUrl, String>>,
    revoked: RwLock<Vec<ModuleUrl>>,
}

impl StaticScriptHost {
    /// Create an empty host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the namespace produced by evaluating `code`.
    pub fn register(&self, code: impl Into<String>, namespace: ModuleNamespace) {
        self.modules
            .write()
            .expect("script host poisoned")
            .insert(code.into(), namespace);
    }

    /// URLs revoked so far (every created URL must end up here).
    pub fn revoked_urls(&self) -> Vec<ModuleUrl> {
        self.revoked.read().expect("script host poisoned").clone()
    }

    /// Number of URLs created and not yet revoked.
    pub fn live_urls(&self) -> usize {
        self.urls.read().expect("script host poisoned").len()
    }
}

#[async_trait]
impl ScriptHost for StaticScriptHost {
    fn create_module_url(&self, code: &str) -> ModuleUrl {
        let url = ModuleUrl::generate();
        self.urls
            .write()
            .expect("script host poisoned")
            .insert(url.clone(), code.to_string());
        url
    }

    async fn import_module(&self, url: &ModuleUrl) -> Result<ModuleNamespace> {
        let code = {
            let urls = self.urls.read().expect("script host poisoned");
            urls.get(url).cloned().ok_or_else(|| {
                ExtensionError::LoadFailed(format!("no module at {}", url.as_str()))
            })?
        };
        let modules = self.modules.read().expect("script host poisoned");
        modules
            .get(&code)
            .cloned()
            .ok_or_else(|| ExtensionError::LoadFailed("module source not registered".to_string()))
    }

    fn revoke_module_url(&self, url: &ModuleUrl) {
        self.urls.write().expect("script host poisoned").remove(url);
        self.revoked
            .write()
            .expect("script host poisoned")
            .push(url.clone());
    }
}

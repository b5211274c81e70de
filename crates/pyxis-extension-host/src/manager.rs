//! Extension lifecycle manager
//!
//! Orchestrates install (HTTP and ZIP), enable, disable, uninstall and
//! update, resolves `onlyOne` group conflicts, and fans lifecycle events out
//! to observers. The public methods report failure through their return
//! value and logs rather than by erroring; `execute_command` is the one call
//! that propagates.
//!
//! Enable and disable for the same id serialize behind a per-id lock so two
//! racing `enable` calls cannot both activate. Within one enable call the
//! order is strict: dependency warnings, conflict disable, context build,
//! module load, activate, persist, emit. Activation failure rolls back the
//! partial capability registrations before it is reported; a failure after
//! `activate` but before persistence still calls `deactivate`.

use crate::autoinstall;
use crate::config::RuntimeConfig;
use crate::context::{ContextRegistries, ExtensionContext, SystemModules};
use crate::fetch::{CodeFetcher, FetchedCode, RegistryClient, install_from_zip};
use crate::loader::{ExtensionExports, ModuleLoader, ScriptHost, StaticScriptHost};
use crate::output::{OutputChannel, TracingOutputChannel};
use crate::registries::commands::CommandContext;
use crate::store::{ExtensionStore, FsStore, MemoryStore};
use indexmap::IndexMap;
use pyxis_extension_sdk::activation::{BuiltInModule, ExtensionActivation, LanguagePack};
use pyxis_extension_sdk::error::{ExtensionError, Result};
use pyxis_extension_sdk::manifest::ExtensionManifest;
use pyxis_extension_sdk::record::{
    CachedAsset, CodeCache, ExtensionStatus, InstalledExtension, unix_now,
};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Kind of a lifecycle change event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionEventKind {
    Installed,
    Enabled,
    Disabled,
    Uninstalled,
}

/// Lifecycle change event delivered to observers
#[derive(Debug, Clone)]
pub struct ExtensionEvent {
    /// What happened
    pub kind: ExtensionEventKind,
    /// The affected extension
    pub extension_id: String,
    /// The manifest, when one is at hand
    pub manifest: Option<ExtensionManifest>,
}

/// Observer of lifecycle events
pub type EventListener = Arc<dyn Fn(&ExtensionEvent) + Send + Sync>;

/// Handle identifying a registered event listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventListenerHandle(u64);

/// In-memory state of an enabled extension
#[derive(Clone)]
pub struct ActiveExtension {
    /// The manifest at enable time
    pub manifest: ExtensionManifest,
    /// Validated module exports
    pub exports: ExtensionExports,
    /// The value `activate` resolved to
    pub activation: ExtensionActivation,
    /// The context handed to `activate`
    pub context: ExtensionContext,
}

/// Builder for [`ExtensionManager`]
pub struct ExtensionManagerBuilder {
    config: RuntimeConfig,
    store: Option<Arc<dyn ExtensionStore>>,
    script_host: Option<Arc<dyn ScriptHost>>,
    system: SystemModules,
    output: Arc<dyn OutputChannel>,
    registries: ContextRegistries,
}

impl ExtensionManagerBuilder {
    /// Start a builder with the given configuration.
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            store: None,
            script_host: None,
            system: SystemModules::new(),
            output: Arc::new(TracingOutputChannel),
            registries: ContextRegistries::default(),
        }
    }

    /// Use a specific store (defaults to [`FsStore`] under the config directory).
    pub fn with_store(mut self, store: Arc<dyn ExtensionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use an in-memory store.
    pub fn with_memory_store(self) -> Self {
        self.with_store(Arc::new(MemoryStore::new()))
    }

    /// Use a specific script host (defaults to [`StaticScriptHost`]).
    pub fn with_script_host(mut self, host: Arc<dyn ScriptHost>) -> Self {
        self.script_host = Some(host);
        self
    }

    /// Inject the system-module collaborators.
    pub fn with_system_modules(mut self, system: SystemModules) -> Self {
        self.system = system;
        self
    }

    /// Route extension output to a specific channel.
    pub fn with_output(mut self, output: Arc<dyn OutputChannel>) -> Self {
        self.output = output;
        self
    }

    /// Share existing capability registries with the host UI.
    pub fn with_registries(mut self, registries: ContextRegistries) -> Self {
        self.registries = registries;
        self
    }

    /// Build the manager.
    pub fn build(self) -> Result<ExtensionManager> {
        let store: Arc<dyn ExtensionStore> = match self.store {
            Some(store) => store,
            None => Arc::new(FsStore::new(self.config.store_directory())?),
        };
        let script_host: Arc<dyn ScriptHost> = match self.script_host {
            Some(host) => host,
            None => Arc::new(StaticScriptHost::new()),
        };

        Ok(ExtensionManager {
            registry_client: RegistryClient::new(self.config.clone())?,
            code_fetcher: CodeFetcher::new(self.config.clone())?,
            loader: ModuleLoader::new(script_host),
            config: self.config,
            store,
            system: self.system,
            output: self.output,
            registries: self.registries,
            active: RwLock::new(IndexMap::new()),
            locks: Mutex::new(HashMap::new()),
            listeners: std::sync::RwLock::new(Vec::new()),
            next_listener_id: AtomicU64::new(0),
        })
    }
}

/// The lifecycle orchestrator
pub struct ExtensionManager {
    config: RuntimeConfig,
    store: Arc<dyn ExtensionStore>,
    registry_client: RegistryClient,
    code_fetcher: CodeFetcher,
    loader: ModuleLoader,
    registries: ContextRegistries,
    system: SystemModules,
    output: Arc<dyn OutputChannel>,
    // Insertion-ordered so built-in module aggregation is stable.
    active: RwLock<IndexMap<String, ActiveExtension>>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    listeners: std::sync::RwLock<Vec<(u64, EventListener)>>,
    next_listener_id: AtomicU64,
}

impl ExtensionManager {
    /// Start a builder.
    pub fn builder(config: RuntimeConfig) -> ExtensionManagerBuilder {
        ExtensionManagerBuilder::new(config)
    }

    /// The runtime configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The registry client.
    pub fn registry(&self) -> &RegistryClient {
        &self.registry_client
    }

    /// The shared capability registries.
    pub fn registries(&self) -> &ContextRegistries {
        &self.registries
    }

    /// The persistent store.
    pub fn store(&self) -> &Arc<dyn ExtensionStore> {
        &self.store
    }

    /// Load persisted records, enable the enabled ones, and hand off to the
    /// auto-installer when the store is empty (first run).
    pub async fn init(&self) -> Result<()> {
        let records = self.store.get_all().await?;
        if records.is_empty() {
            info!("No installed extensions, running first-time setup");
            autoinstall::run(self).await;
            return Ok(());
        }

        for record in records.iter().filter(|r| r.enabled) {
            if !self.enable(&record.manifest.id).await {
                warn!("Startup enable of {} failed", record.manifest.id);
            }
        }
        info!(
            "Extension manager initialized, {} installed, {} active",
            records.len(),
            self.active.read().await.len()
        );
        Ok(())
    }

    async fn id_lock(&self, id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Dependency ids declared by the manifest but not installed.
    pub async fn missing_dependencies(&self, manifest: &ExtensionManifest) -> Vec<String> {
        let mut missing = Vec::new();
        for dependency in &manifest.dependencies {
            match self.store.get(dependency).await {
                Ok(Some(_)) => {}
                _ => missing.push(dependency.clone()),
            }
        }
        missing
    }

    async fn warn_unmet_dependencies(&self, manifest: &ExtensionManifest) {
        let missing = self.missing_dependencies(manifest).await;
        if !missing.is_empty() {
            warn!(
                "Extension {} declares unmet dependencies: {}",
                manifest.id,
                missing.join(", ")
            );
        }
    }

    /// Install an extension from a manifest URL, then auto-enable it.
    ///
    /// Returns the installed record (the existing one if the id was already
    /// installed), or `None` when fetching fails.
    pub async fn install_extension(&self, manifest_url: &str) -> Option<InstalledExtension> {
        let manifest = self.registry_client.fetch_manifest(manifest_url).await?;

        if let Ok(Some(existing)) = self.store.get(&manifest.id).await {
            debug!("Extension {} already installed", manifest.id);
            return Some(existing);
        }
        self.warn_unmet_dependencies(&manifest).await;

        let code = match self.code_fetcher.fetch(&manifest).await {
            Some(code) => code,
            None => {
                warn!("Install of {} aborted, code fetch failed", manifest.id);
                return None;
            }
        };
        self.finish_install(manifest, code).await
    }

    /// Install an extension from an uploaded ZIP archive, then auto-enable it.
    pub async fn install_from_zip(&self, bytes: Vec<u8>) -> Option<InstalledExtension> {
        let package = match tokio::task::spawn_blocking(move || install_from_zip(&bytes)).await {
            Ok(Ok(package)) => package,
            Ok(Err(e)) => {
                warn!("ZIP install failed: {}", e);
                return None;
            }
            Err(e) => {
                warn!("ZIP install task failed: {}", e);
                return None;
            }
        };

        if let Ok(Some(existing)) = self.store.get(&package.manifest.id).await {
            debug!("Extension {} already installed", package.manifest.id);
            return Some(existing);
        }
        self.warn_unmet_dependencies(&package.manifest).await;
        self.finish_install(package.manifest, package.code).await
    }

    /// Shared install tail: persist the record, emit, auto-enable.
    async fn finish_install(
        &self,
        manifest: ExtensionManifest,
        code: FetchedCode,
    ) -> Option<InstalledExtension> {
        let id = manifest.id.clone();
        let files = code
            .files
            .into_iter()
            .map(|(path, content)| (path, CachedAsset::Text(content)))
            .collect();
        let record = InstalledExtension::new(
            manifest,
            CodeCache {
                entry_code: code.entry_code,
                files,
                cached_at: unix_now(),
            },
        );

        if let Err(e) = self.store.set(record.clone()).await {
            warn!("Install of {} failed to persist: {}", id, e);
            return None;
        }
        info!("Extension {} installed", id);
        self.emit(ExtensionEvent {
            kind: ExtensionEventKind::Installed,
            extension_id: id.clone(),
            manifest: Some(record.manifest.clone()),
        });

        // Auto-enable; a failure here does not fail the install.
        if !self.enable(&id).await {
            warn!("Auto-enable of freshly installed {} failed", id);
        }
        match self.store.get(&id).await {
            Ok(Some(current)) => Some(current),
            _ => Some(record),
        }
    }

    /// Whether an extension is currently active.
    pub async fn is_active(&self, extension_id: &str) -> bool {
        self.active.read().await.contains_key(extension_id)
    }

    /// Ids of active extensions, in activation order.
    pub async fn active_ids(&self) -> Vec<String> {
        self.active.read().await.keys().cloned().collect()
    }

    /// All persisted records.
    pub async fn installed_extensions(&self) -> Vec<InstalledExtension> {
        self.store.get_all().await.unwrap_or_default()
    }

    /// Enable an installed extension. Idempotent when already active.
    pub async fn enable(&self, extension_id: &str) -> bool {
        let lock = self.id_lock(extension_id).await;
        let _guard = lock.lock().await;
        self.enable_locked(extension_id).await
    }

    async fn enable_locked(&self, extension_id: &str) -> bool {
        if self.active.read().await.contains_key(extension_id) {
            return true;
        }

        let record = match self.store.get(extension_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!("Cannot enable {}: not installed", extension_id);
                return false;
            }
            Err(e) => {
                warn!("Cannot enable {}: {}", extension_id, e);
                return false;
            }
        };
        if record.cache.entry_code.is_empty() {
            warn!("Cannot enable {}: cached entry code is empty", extension_id);
            return false;
        }

        self.warn_unmet_dependencies(&record.manifest).await;
        if let Some(group) = record.manifest.only_one.clone() {
            self.disable_group_holders(extension_id, &group).await;
        }

        let context = ExtensionContext::build(
            &record.manifest,
            self.registries.clone(),
            self.system.clone(),
            self.output.clone(),
        );

        let exports = match self.loader.load(extension_id, &record.cache.entry_code).await {
            Ok(exports) => exports,
            Err(e) => {
                warn!("Module load for {} failed: {}", extension_id, e);
                self.record_enable_failure(record, &e).await;
                return false;
            }
        };

        let activate = exports.activate.clone();
        let activation = tokio::time::timeout(
            Duration::from_secs(self.config.activation_timeout_secs),
            activate(context.clone()),
        )
        .await;
        let activation = match activation {
            Ok(Ok(activation)) => activation,
            Ok(Err(e)) => {
                warn!("Activation of {} failed: {}", extension_id, e);
                self.rollback_partial_activation(extension_id, &context);
                self.record_enable_failure(record, &e).await;
                return false;
            }
            Err(_) => {
                let e = ExtensionError::Timeout(format!("activate of {}", extension_id));
                warn!("{}", e);
                self.rollback_partial_activation(extension_id, &context);
                self.record_enable_failure(record, &e).await;
                return false;
            }
        };

        self.active.write().await.insert(
            extension_id.to_string(),
            ActiveExtension {
                manifest: record.manifest.clone(),
                exports: exports.clone(),
                activation,
                context: context.clone(),
            },
        );

        let mut record = record;
        record.enabled = true;
        record.status = ExtensionStatus::Enabled;
        record.error = None;
        record.updated_at = unix_now();
        let manifest = record.manifest.clone();
        if let Err(e) = self.store.set(record).await {
            warn!("Persisting enabled {} failed: {}", extension_id, e);
            // Activation already ran; keep the symmetry before unwinding.
            self.run_deactivate(extension_id, &exports).await;
            self.rollback_partial_activation(extension_id, &context);
            self.active.write().await.shift_remove(extension_id);
            return false;
        }

        info!("Extension {} enabled", extension_id);
        self.emit(ExtensionEvent {
            kind: ExtensionEventKind::Enabled,
            extension_id: extension_id.to_string(),
            manifest: Some(manifest),
        });
        true
    }

    /// Disable every other enabled member of an `onlyOne` group.
    async fn disable_group_holders(&self, extension_id: &str, group: &str) {
        let records = self.store.get_all().await.unwrap_or_default();
        for record in records {
            if record.manifest.id == extension_id
                || record.manifest.only_one.as_deref() != Some(group)
                || !record.enabled
            {
                continue;
            }
            info!(
                "Extension {} takes over group '{}' from {}",
                extension_id, group, record.manifest.id
            );
            self.disable(&record.manifest.id).await;
        }
    }

    /// Undo registrations a failed activation may have left behind.
    fn rollback_partial_activation(&self, extension_id: &str, context: &ExtensionContext) {
        context.dispose_capabilities();
        self.registries.commands.unregister_all(extension_id);
    }

    async fn record_enable_failure(&self, mut record: InstalledExtension, err: &ExtensionError) {
        record.status = ExtensionStatus::Error;
        record.enabled = false;
        record.error = Some(err.to_string());
        record.updated_at = unix_now();
        let id = record.manifest.id.clone();
        if let Err(e) = self.store.set(record).await {
            warn!("Persisting failure state of {} failed: {}", id, e);
        }
    }

    async fn run_deactivate(&self, extension_id: &str, exports: &ExtensionExports) {
        let Some(deactivate) = &exports.deactivate else {
            return;
        };
        let result = tokio::time::timeout(
            Duration::from_secs(self.config.activation_timeout_secs),
            deactivate(),
        )
        .await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Deactivate of {} failed: {}", extension_id, e),
            Err(_) => warn!("Deactivate of {} timed out", extension_id),
        }
    }

    /// Disable an active extension. Idempotent when not active.
    pub async fn disable(&self, extension_id: &str) -> bool {
        let lock = self.id_lock(extension_id).await;
        let _guard = lock.lock().await;
        self.disable_locked(extension_id).await
    }

    async fn disable_locked(&self, extension_id: &str) -> bool {
        let Some(entry) = self.active.read().await.get(extension_id).cloned() else {
            return true;
        };

        entry.context.dispose_capabilities();
        self.registries.commands.unregister_all(extension_id);
        self.run_deactivate(extension_id, &entry.exports).await;
        self.active.write().await.shift_remove(extension_id);

        match self.store.get(extension_id).await {
            Ok(Some(mut record)) => {
                record.enabled = false;
                record.status = ExtensionStatus::Installed;
                record.updated_at = unix_now();
                if let Err(e) = self.store.set(record).await {
                    warn!("Persisting disabled {} failed: {}", extension_id, e);
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Loading record for disabled {} failed: {}", extension_id, e),
        }

        info!("Extension {} disabled", extension_id);
        self.emit(ExtensionEvent {
            kind: ExtensionEventKind::Disabled,
            extension_id: extension_id.to_string(),
            manifest: Some(entry.manifest.clone()),
        });
        true
    }

    /// Uninstall an extension, disabling it first when active.
    pub async fn uninstall(&self, extension_id: &str) -> bool {
        let lock = self.id_lock(extension_id).await;
        let _guard = lock.lock().await;

        let record = match self.store.get(extension_id).await {
            Ok(Some(record)) => record,
            _ => {
                warn!("Cannot uninstall {}: not installed", extension_id);
                return false;
            }
        };

        self.disable_locked(extension_id).await;
        if let Err(e) = self.store.delete(extension_id).await {
            warn!("Deleting record of {} failed: {}", extension_id, e);
            return false;
        }

        info!("Extension {} uninstalled", extension_id);
        self.emit(ExtensionEvent {
            kind: ExtensionEventKind::Uninstalled,
            extension_id: extension_id.to_string(),
            manifest: Some(record.manifest),
        });
        true
    }

    /// Re-fetch an installed extension's manifest and code from the registry.
    ///
    /// Preserves enablement: an enabled extension is re-enabled on the new
    /// code once the cache is replaced.
    pub async fn update(&self, extension_id: &str) -> bool {
        let Some(index) = self.registry_client.fetch_registry(false).await else {
            return false;
        };
        let Some(entry) = index.find(extension_id) else {
            warn!("Cannot update {}: not in the registry", extension_id);
            return false;
        };
        let Some(manifest) = self.registry_client.fetch_manifest(&entry.manifest_url).await
        else {
            return false;
        };

        let lock = self.id_lock(extension_id).await;
        let guard = lock.lock().await;

        let Ok(Some(mut record)) = self.store.get(extension_id).await else {
            warn!("Cannot update {}: not installed", extension_id);
            return false;
        };
        let was_enabled = record.enabled;

        record.status = ExtensionStatus::Updating;
        if let Err(e) = self.store.set(record.clone()).await {
            warn!("Persisting updating {} failed: {}", extension_id, e);
        }

        let Some(code) = self.code_fetcher.fetch(&manifest).await else {
            record.status = ExtensionStatus::Error;
            record.error = Some("update fetch failed".to_string());
            let _ = self.store.set(record).await;
            return false;
        };

        self.disable_locked(extension_id).await;

        record.manifest = manifest;
        record.cache = CodeCache {
            entry_code: code.entry_code,
            files: code
                .files
                .into_iter()
                .map(|(path, content)| (path, CachedAsset::Text(content)))
                .collect(),
            cached_at: unix_now(),
        };
        record.status = ExtensionStatus::Installed;
        record.enabled = false;
        record.error = None;
        record.updated_at = unix_now();
        if let Err(e) = self.store.set(record).await {
            warn!("Persisting updated {} failed: {}", extension_id, e);
            return false;
        }
        info!("Extension {} updated", extension_id);

        drop(guard);
        if was_enabled {
            return self.enable(extension_id).await;
        }
        true
    }

    /// Execute a registered command. Errors propagate to the caller.
    pub async fn execute_command(
        &self,
        name: &str,
        args: Vec<String>,
        context: CommandContext,
    ) -> Result<String> {
        self.registries.commands.execute(name, args, context).await
    }

    /// Language packs published by active extensions.
    pub async fn enabled_language_packs(&self) -> Vec<LanguagePack> {
        self.active
            .read()
            .await
            .values()
            .filter_map(|entry| entry.activation.language_pack())
            .collect()
    }

    /// Built-in modules merged across active extensions.
    ///
    /// Later activations win on name collisions; order is stable by
    /// activation then contribution order.
    pub async fn all_built_in_modules(&self) -> IndexMap<String, BuiltInModule> {
        let mut merged = IndexMap::new();
        for entry in self.active.read().await.values() {
            for (name, module) in &entry.activation.built_in_modules {
                merged.insert(name.clone(), module.clone());
            }
        }
        merged
    }

    /// The in-memory state of one active extension.
    pub async fn active_extension(&self, extension_id: &str) -> Option<ActiveExtension> {
        self.active.read().await.get(extension_id).cloned()
    }

    /// Register a lifecycle event listener.
    pub fn subscribe(&self, listener: EventListener) -> EventListenerHandle {
        let id = self.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.listeners
            .write()
            .expect("listener set poisoned")
            .push((id, listener));
        EventListenerHandle(id)
    }

    /// Remove a lifecycle event listener.
    pub fn unsubscribe(&self, handle: EventListenerHandle) {
        self.listeners
            .write()
            .expect("listener set poisoned")
            .retain(|(id, _)| *id != handle.0);
    }

    /// Deliver an event to listeners in registration order, isolating panics.
    fn emit(&self, event: ExtensionEvent) {
        let listeners: Vec<_> = self
            .listeners
            .read()
            .expect("listener set poisoned")
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(&event))).is_err() {
                warn!("Extension event listener panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{ModuleNamespace, activate_fn, deactivate_fn};
    use crate::registries::tabs::CreateTabOptions;
    use pyxis_extension_sdk::manifest::ExtensionKind;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::AtomicUsize;

    fn manifest(id: &str, only_one: Option<&str>) -> ExtensionManifest {
        ExtensionManifest {
            id: id.to_string(),
            name: id.to_string(),
            version: "1.0.0".to_string(),
            kind: ExtensionKind::Tool,
            description: None,
            author: None,
            entry: "index.js".to_string(),
            files: Vec::new(),
            dependencies: Vec::new(),
            only_one: only_one.map(str::to_string),
            pack_group: None,
            metadata: None,
        }
    }

    fn record(id: &str, only_one: Option<&str>) -> InstalledExtension {
        InstalledExtension::new(
            manifest(id, only_one),
            CodeCache {
                entry_code: format!("module:{}", id),
                files: HashMap::new(),
                cached_at: unix_now(),
            },
        )
    }

    fn test_manager() -> (ExtensionManager, Arc<StaticScriptHost>) {
        let host = Arc::new(StaticScriptHost::new());
        let manager = ExtensionManager::builder(RuntimeConfig::default())
            .with_memory_store()
            .with_script_host(host.clone())
            .build()
            .unwrap();
        (manager, host)
    }

    fn simple_module() -> ModuleNamespace {
        ModuleNamespace {
            activate: Some(activate_fn(|_ctx| async { Ok(ExtensionActivation::new()) })),
            deactivate: None,
        }
    }

    async fn seed(manager: &ExtensionManager, record: InstalledExtension) {
        manager.store().set(record).await.unwrap();
    }

    fn collect_events(manager: &ExtensionManager) -> Arc<StdMutex<Vec<(ExtensionEventKind, String)>>> {
        let events = Arc::new(StdMutex::new(Vec::new()));
        let sink = events.clone();
        manager.subscribe(Arc::new(move |event: &ExtensionEvent| {
            sink.lock()
                .unwrap()
                .push((event.kind, event.extension_id.clone()));
        }));
        events
    }

    #[tokio::test]
    async fn test_enable_disable_lifecycle() {
        let (manager, host) = test_manager();
        seed(&manager, record("a.hello", None)).await;
        host.register(
            "module:a.hello",
            ModuleNamespace {
                activate: Some(activate_fn(|_ctx| async {
                    Ok(ExtensionActivation::new().with_built_in_module(
                        "greet",
                        Arc::new(|_| json!("hi")),
                    ))
                })),
                deactivate: None,
            },
        );

        assert!(manager.enable("a.hello").await);
        assert!(manager.is_active("a.hello").await);

        let modules = manager.all_built_in_modules().await;
        assert_eq!(modules["greet"](json!(null)), json!("hi"));

        let record = manager.store().get("a.hello").await.unwrap().unwrap();
        assert!(record.enabled);
        assert_eq!(record.status, ExtensionStatus::Enabled);

        assert!(manager.disable("a.hello").await);
        assert!(!manager.is_active("a.hello").await);
        let record = manager.store().get("a.hello").await.unwrap().unwrap();
        assert!(!record.enabled);
        assert_eq!(record.status, ExtensionStatus::Installed);
    }

    #[tokio::test]
    async fn test_enable_is_idempotent_and_concurrency_safe() {
        let (manager, host) = test_manager();
        seed(&manager, record("a.solo", None)).await;

        let activations = Arc::new(AtomicUsize::new(0));
        let counter = activations.clone();
        host.register(
            "module:a.solo",
            ModuleNamespace {
                activate: Some(activate_fn(move |_ctx| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(ExtensionActivation::new())
                    }
                })),
                deactivate: None,
            },
        );

        let (first, second) = tokio::join!(manager.enable("a.solo"), manager.enable("a.solo"));
        assert!(first && second);
        assert_eq!(activations.load(Ordering::SeqCst), 1);
        assert_eq!(manager.active_ids().await, vec!["a.solo".to_string()]);

        // A third call is a no-op.
        assert!(manager.enable("a.solo").await);
        assert_eq!(activations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_only_one_group_handover() {
        let (manager, host) = test_manager();
        seed(&manager, record("v.lang.en", Some("lang-pack"))).await;
        seed(&manager, record("v.lang.ja", Some("lang-pack"))).await;
        host.register("module:v.lang.en", simple_module());
        host.register("module:v.lang.ja", simple_module());

        assert!(manager.enable("v.lang.en").await);
        let events = collect_events(&manager);
        assert!(manager.enable("v.lang.ja").await);

        assert!(!manager.is_active("v.lang.en").await);
        assert!(manager.is_active("v.lang.ja").await);
        let en = manager.store().get("v.lang.en").await.unwrap().unwrap();
        assert!(!en.enabled);

        let seen = events.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                (ExtensionEventKind::Disabled, "v.lang.en".to_string()),
                (ExtensionEventKind::Enabled, "v.lang.ja".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_activate_marks_error() {
        let (manager, host) = test_manager();
        seed(&manager, record("a.broken", None)).await;
        host.register("module:a.broken", ModuleNamespace::default());

        let events = collect_events(&manager);
        assert!(!manager.enable("a.broken").await);
        assert!(!manager.is_active("a.broken").await);

        let record = manager.store().get("a.broken").await.unwrap().unwrap();
        assert_eq!(record.status, ExtensionStatus::Error);
        assert!(!record.enabled);
        assert!(record.error.is_some());
        assert!(events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_activation_failure_rolls_back_registrations() {
        let (manager, host) = test_manager();
        seed(&manager, record("a.partial", None)).await;
        host.register(
            "module:a.partial",
            ModuleNamespace {
                activate: Some(activate_fn(|ctx: ExtensionContext| async move {
                    // Register capabilities, then fail.
                    ctx.tabs().register_tab_type("Partial", None, "PartialView");
                    ctx.tabs()
                        .create_tab("Half done", json!({}), CreateTabOptions::default());
                    ctx.commands().register(
                        "partial.cmd",
                        crate::registries::commands::command_fn(|_, _| async {
                            Ok(String::new())
                        }),
                    );
                    Err(ExtensionError::activation("boom"))
                })),
                deactivate: None,
            },
        );

        assert!(!manager.enable("a.partial").await);

        let registries = manager.registries();
        assert!(registries.tabs.tabs_for_extension("a.partial").is_empty());
        assert!(registries.tabs.type_for_kind("extension:a.partial").is_none());
        assert!(!registries.commands.has("partial.cmd"));
        assert_eq!(
            manager.store().get("a.partial").await.unwrap().unwrap().status,
            ExtensionStatus::Error
        );
    }

    #[tokio::test]
    async fn test_disable_tears_down_capabilities() {
        let (manager, host) = test_manager();
        seed(&manager, record("a.caps", None)).await;
        host.register(
            "module:a.caps",
            ModuleNamespace {
                activate: Some(activate_fn(|ctx: ExtensionContext| async move {
                    ctx.tabs().register_tab_type("Caps", None, "CapsView");
                    ctx.tabs()
                        .create_tab("One", json!({}), CreateTabOptions::default());
                    ctx.commands().register(
                        "caps.run",
                        crate::registries::commands::command_fn(|_, _| async {
                            Ok("ran".to_string())
                        }),
                    );
                    Ok(ExtensionActivation::new())
                })),
                deactivate: None,
            },
        );

        assert!(manager.enable("a.caps").await);
        assert_eq!(manager.registries().tabs.tabs_for_extension("a.caps").len(), 1);
        assert!(manager.registries().commands.has("caps.run"));

        assert!(manager.disable("a.caps").await);
        assert!(manager.registries().tabs.tabs_for_extension("a.caps").is_empty());
        assert!(!manager.registries().commands.has("caps.run"));
        assert!(!manager.is_active("a.caps").await);
    }

    #[tokio::test]
    async fn test_deactivate_failure_does_not_block_disable() {
        let (manager, host) = test_manager();
        seed(&manager, record("a.grumpy", None)).await;
        host.register(
            "module:a.grumpy",
            ModuleNamespace {
                activate: Some(activate_fn(|_ctx| async { Ok(ExtensionActivation::new()) })),
                deactivate: Some(deactivate_fn(|| async {
                    Err(ExtensionError::DeactivationFailed("refusing".to_string()))
                })),
            },
        );

        assert!(manager.enable("a.grumpy").await);
        assert!(manager.disable("a.grumpy").await);
        assert!(!manager.is_active("a.grumpy").await);
    }

    #[tokio::test]
    async fn test_uninstall_disables_first() {
        let (manager, host) = test_manager();
        seed(&manager, record("a.gone", None)).await;
        host.register("module:a.gone", simple_module());
        assert!(manager.enable("a.gone").await);

        let events = collect_events(&manager);
        assert!(manager.uninstall("a.gone").await);

        assert!(!manager.is_active("a.gone").await);
        assert!(manager.store().get("a.gone").await.unwrap().is_none());
        let seen = events.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                (ExtensionEventKind::Disabled, "a.gone".to_string()),
                (ExtensionEventKind::Uninstalled, "a.gone".to_string()),
            ]
        );

        assert!(!manager.uninstall("a.gone").await);
    }

    #[tokio::test]
    async fn test_unsubscribed_listener_receives_nothing() {
        let (manager, host) = test_manager();
        seed(&manager, record("a.quiet", None)).await;
        host.register("module:a.quiet", simple_module());

        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let handle = manager.subscribe(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        manager.unsubscribe(handle);

        manager.enable("a.quiet").await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_enabled_language_packs() {
        let (manager, host) = test_manager();
        seed(&manager, record("v.lang.ja", Some("lang-pack"))).await;
        host.register(
            "module:v.lang.ja",
            ModuleNamespace {
                activate: Some(activate_fn(|_ctx| async {
                    Ok(ExtensionActivation::new().with_language_pack(&LanguagePack {
                        locale: "ja".to_string(),
                        name: "Japanese".to_string(),
                        native_name: "日本語".to_string(),
                    }))
                })),
                deactivate: None,
            },
        );

        assert!(manager.enable("v.lang.ja").await);
        let packs = manager.enabled_language_packs().await;
        assert_eq!(packs.len(), 1);
        assert_eq!(packs[0].locale, "ja");
    }

    #[tokio::test]
    async fn test_built_in_modules_later_wins() {
        let (manager, host) = test_manager();
        seed(&manager, record("a.first", None)).await;
        seed(&manager, record("b.second", None)).await;
        host.register(
            "module:a.first",
            ModuleNamespace {
                activate: Some(activate_fn(|_ctx| async {
                    Ok(ExtensionActivation::new()
                        .with_built_in_module("shared", Arc::new(|_| json!("first")))
                        .with_built_in_module("only-first", Arc::new(|_| json!(1))))
                })),
                deactivate: None,
            },
        );
        host.register(
            "module:b.second",
            ModuleNamespace {
                activate: Some(activate_fn(|_ctx| async {
                    Ok(ExtensionActivation::new()
                        .with_built_in_module("shared", Arc::new(|_| json!("second"))))
                })),
                deactivate: None,
            },
        );

        assert!(manager.enable("a.first").await);
        assert!(manager.enable("b.second").await);

        let modules = manager.all_built_in_modules().await;
        assert_eq!(modules["shared"](json!(null)), json!("second"));
        let names: Vec<_> = modules.keys().cloned().collect();
        assert_eq!(names, vec!["shared".to_string(), "only-first".to_string()]);
    }

    #[tokio::test]
    async fn test_execute_command_merges_caller_context() {
        let (manager, host) = test_manager();
        seed(&manager, record("a.cli", None)).await;
        host.register(
            "module:a.cli",
            ModuleNamespace {
                activate: Some(activate_fn(|ctx: ExtensionContext| async move {
                    ctx.commands().register(
                        "where",
                        crate::registries::commands::command_fn(|_args, ctx| async move {
                            let dir = ctx.current_dir.unwrap_or_default();
                            let ext = ctx
                                .extension
                                .map(|e| e.extension_id().to_string())
                                .unwrap_or_default();
                            Ok(format!("{}:{}", ext, dir))
                        }),
                    );
                    Ok(ExtensionActivation::new())
                })),
                deactivate: None,
            },
        );

        assert!(manager.enable("a.cli").await);
        let output = manager
            .execute_command(
                "where",
                Vec::new(),
                CommandContext {
                    current_dir: Some("/project".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(output, "a.cli:/project");

        let err = manager
            .execute_command("missing", Vec::new(), CommandContext::default())
            .await;
        assert!(matches!(err, Err(ExtensionError::CommandNotFound(_))));
    }
}

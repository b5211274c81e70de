//! Extension contexts
//!
//! Each extension receives an [`ExtensionContext`] at activation: a
//! capability bundle (tabs, sidebar, explorer menu, commands), a logger
//! prefixed with its id, and a typed accessor over the closed set of system
//! modules. Extensions may hold the context for their whole lifetime; the
//! manager does not invalidate it at disable time, it only tears down the
//! registrations made through it.

use crate::api::{CommandsApi, ExplorerMenuApi, SidebarApi, TabApi};
use crate::output::{EXTENSIONS_CHANNEL, LogSeverity, OutputChannel};
use crate::registries::commands::CommandRegistry;
use crate::registries::explorer_menu::ExplorerMenuRegistry;
use crate::registries::sidebar::SidebarRegistry;
use crate::registries::tabs::TabRegistry;
use pyxis_extension_sdk::error::{ExtensionError, Result};
use pyxis_extension_sdk::manifest::ExtensionManifest;
use pyxis_extension_sdk::system::{
    FileRepository, ModuleNormalizer, PathUtils, TerminalCommands,
};
use std::sync::Arc;

/// Collaborators the embedding IDE injects into the runtime
#[derive(Clone, Default)]
pub struct SystemModules {
    /// The virtual filesystem
    pub file_repository: Option<Arc<dyn FileRepository>>,
    /// Path utilities
    pub path_utils: Option<Arc<dyn PathUtils>>,
    /// Built-in terminal command singletons
    pub terminal_commands: Option<Arc<dyn TerminalCommands>>,
    /// CommonJS/ESM normalizer
    pub module_normalizer: Option<Arc<dyn ModuleNormalizer>>,
}

impl SystemModules {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the file repository.
    pub fn with_file_repository(mut self, repo: Arc<dyn FileRepository>) -> Self {
        self.file_repository = Some(repo);
        self
    }

    /// Set the path utilities.
    pub fn with_path_utils(mut self, utils: Arc<dyn PathUtils>) -> Self {
        self.path_utils = Some(utils);
        self
    }

    /// Set the terminal command singletons.
    pub fn with_terminal_commands(mut self, commands: Arc<dyn TerminalCommands>) -> Self {
        self.terminal_commands = Some(commands);
        self
    }

    /// Set the module normalizer.
    pub fn with_module_normalizer(mut self, normalizer: Arc<dyn ModuleNormalizer>) -> Self {
        self.module_normalizer = Some(normalizer);
        self
    }
}

/// A resolved system module
#[derive(Clone)]
pub enum SystemModule {
    /// The virtual filesystem
    FileRepository(Arc<dyn FileRepository>),
    /// Path utilities
    PathUtils(Arc<dyn PathUtils>),
    /// The process-wide command registry
    CommandRegistry(Arc<CommandRegistry>),
    /// Built-in terminal command singletons
    TerminalCommands(Arc<dyn TerminalCommands>),
    /// CommonJS/ESM normalizer
    ModuleNormalizer(Arc<dyn ModuleNormalizer>),
}

/// Logger handed to extensions; prefixes every message with the id
#[derive(Clone)]
pub struct ContextLogger {
    extension_id: String,
    channel: Arc<dyn OutputChannel>,
}

impl ContextLogger {
    /// Create a logger for one extension.
    pub fn new(extension_id: impl Into<String>, channel: Arc<dyn OutputChannel>) -> Self {
        Self {
            extension_id: extension_id.into(),
            channel,
        }
    }

    fn emit(&self, message: &str, severity: LogSeverity) {
        let line = format!("[{}] {}", self.extension_id, message);
        self.channel.append(&line, severity, EXTENSIONS_CHANNEL);
    }

    /// Log at info severity.
    pub fn info(&self, message: &str) {
        self.emit(message, LogSeverity::Info);
    }

    /// Log at warn severity.
    pub fn warn(&self, message: &str) {
        self.emit(message, LogSeverity::Warn);
    }

    /// Log at error severity.
    pub fn error(&self, message: &str) {
        self.emit(message, LogSeverity::Error);
    }
}

struct ContextInner {
    extension_id: String,
    extension_path: String,
    version: String,
    logger: ContextLogger,
    system: SystemModules,
    command_registry: Arc<CommandRegistry>,
    tabs: TabApi,
    sidebar: SidebarApi,
    explorer_menu: ExplorerMenuApi,
    commands: CommandsApi,
}

/// Capability bundle handed to `activate`
#[derive(Clone)]
pub struct ExtensionContext {
    inner: Arc<ContextInner>,
}

impl ExtensionContext {
    /// Build the context for an extension.
    pub fn build(
        manifest: &ExtensionManifest,
        registries: ContextRegistries,
        system: SystemModules,
        output: Arc<dyn OutputChannel>,
    ) -> Self {
        let extension_id = manifest.id.clone();
        let tabs = TabApi::new(&extension_id, registries.tabs);
        let sidebar = SidebarApi::new(&extension_id, registries.sidebar);
        let explorer_menu = ExplorerMenuApi::new(&extension_id, registries.explorer_menu);
        let commands = CommandsApi::new(&extension_id, registries.commands.clone());

        let context = Self {
            inner: Arc::new(ContextInner {
                extension_path: format!("extensions/{}", manifest.package_dir()),
                version: manifest.version.clone(),
                logger: ContextLogger::new(&extension_id, output),
                system,
                command_registry: registries.commands,
                tabs,
                sidebar,
                explorer_menu,
                commands,
                extension_id,
            }),
        };
        context.inner.commands.attach_context(context.clone());
        context
    }

    /// The extension id.
    pub fn extension_id(&self) -> &str {
        &self.inner.extension_id
    }

    /// The extension's package path under the extensions base.
    pub fn extension_path(&self) -> &str {
        &self.inner.extension_path
    }

    /// The extension version.
    pub fn version(&self) -> &str {
        &self.inner.version
    }

    /// The `[id]`-prefixed logger.
    pub fn logger(&self) -> &ContextLogger {
        &self.inner.logger
    }

    /// Tab capability façade.
    pub fn tabs(&self) -> &TabApi {
        &self.inner.tabs
    }

    /// Sidebar capability façade.
    pub fn sidebar(&self) -> &SidebarApi {
        &self.inner.sidebar
    }

    /// Explorer menu capability façade.
    pub fn explorer_menu(&self) -> &ExplorerMenuApi {
        &self.inner.explorer_menu
    }

    /// Commands capability façade.
    pub fn commands(&self) -> &CommandsApi {
        &self.inner.commands
    }

    /// Typed dispatch over the closed system-module set.
    ///
    /// Unknown names error; so does a known module the host did not provide.
    pub fn system_module(&self, name: &str) -> Result<SystemModule> {
        let system = &self.inner.system;
        match name {
            "fileRepository" => system
                .file_repository
                .clone()
                .map(SystemModule::FileRepository)
                .ok_or_else(|| ExtensionError::SystemModuleUnavailable(name.to_string())),
            "pathUtils" => system
                .path_utils
                .clone()
                .map(SystemModule::PathUtils)
                .ok_or_else(|| ExtensionError::SystemModuleUnavailable(name.to_string())),
            "commandRegistry" => Ok(SystemModule::CommandRegistry(
                self.inner.command_registry.clone(),
            )),
            "terminalCommands" => system
                .terminal_commands
                .clone()
                .map(SystemModule::TerminalCommands)
                .ok_or_else(|| ExtensionError::SystemModuleUnavailable(name.to_string())),
            "moduleNormalizer" => system
                .module_normalizer
                .clone()
                .map(SystemModule::ModuleNormalizer)
                .ok_or_else(|| ExtensionError::SystemModuleUnavailable(name.to_string())),
            other => Err(ExtensionError::UnknownSystemModule(other.to_string())),
        }
    }

    /// Tear down every capability registration made through this context.
    ///
    /// Commands are excluded here; the manager unregisters them as its own
    /// disable step.
    pub(crate) fn dispose_capabilities(&self) {
        self.inner.tabs.dispose();
        self.inner.sidebar.dispose();
        self.inner.explorer_menu.dispose();
    }
}

impl std::fmt::Debug for ExtensionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionContext")
            .field("extension_id", &self.inner.extension_id)
            .field("version", &self.inner.version)
            .finish()
    }
}

/// The registry handles a context is built over
#[derive(Clone)]
pub struct ContextRegistries {
    pub tabs: Arc<TabRegistry>,
    pub sidebar: Arc<SidebarRegistry>,
    pub explorer_menu: Arc<ExplorerMenuRegistry>,
    pub commands: Arc<CommandRegistry>,
}

impl Default for ContextRegistries {
    fn default() -> Self {
        Self {
            tabs: Arc::new(TabRegistry::new()),
            sidebar: Arc::new(SidebarRegistry::new()),
            explorer_menu: Arc::new(ExplorerMenuRegistry::new()),
            commands: Arc::new(CommandRegistry::new()),
        }
    }
}

//! Pyxis Extension SDK
//!
//! This crate defines the contract between the Pyxis extension host and the
//! extensions it loads: the manifest and registry wire formats, persisted
//! installation records, activation values, the system-module collaborator
//! traits, and the shared error type.
//!
//! Extensions themselves are authored as dynamically-evaluated modules; the
//! host hands each one a capability-scoped context at activation. The types
//! here describe what flows across that boundary.
//!
//! # Identity
//!
//! Extensions are identified by a dotted id such as `pyxis.markdown-preview`
//! or `pyxis.lang.ja` (language packs). The id is the sole identity: the
//! persistent store, the active map and every capability registration key off
//! it.

pub mod activation;
pub mod error;
pub mod manifest;
pub mod prelude;
pub mod record;
pub mod registry;
pub mod system;

// Re-exports
pub use activation::{
    BuiltInModule, ExtensionActivation, LANGUAGE_PACK_SERVICE, LanguagePack, RuntimeFeatures,
    Transpiler,
};
pub use error::{ExtensionError, Result};
pub use manifest::{ExtensionId, ExtensionKind, ExtensionManifest, ManifestMetadata};
pub use record::{Blob, CachedAsset, CodeCache, ExtensionStatus, InstalledExtension};
pub use registry::{RegistryEntry, RegistryIndex};

//! Prelude module for convenient imports
//!
//! ```rust
//! use pyxis_extension_sdk::prelude::*;
//! ```

// Re-export manifest and catalog types
pub use crate::manifest::{ExtensionId, ExtensionKind, ExtensionManifest, ManifestMetadata};
pub use crate::registry::{RegistryEntry, RegistryIndex};

// Re-export persistence records
pub use crate::record::{
    Blob, CachedAsset, CodeCache, ExtensionStatus, InstalledExtension, unix_now,
};

// Re-export activation types
pub use crate::activation::{
    BuiltInModule, ExtensionActivation, LANGUAGE_PACK_SERVICE, LanguagePack, RuntimeFeatures,
    Transpiler,
};

// Re-export system module traits
pub use crate::system::{
    FileRepository, ModuleNormalizer, PathUtils, TerminalCommands, VirtualPathUtils,
};

// Re-export error types
pub use crate::error::{ExtensionError, Result};

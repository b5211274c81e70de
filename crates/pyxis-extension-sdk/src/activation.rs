//! Activation values returned by extension entry points
//!
//! `activate(context)` resolves to an `ExtensionActivation` describing what
//! the extension contributes: built-in modules, runtime features such as a
//! transpiler, and named services (notably `language-pack`).

use crate::error::Result;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Service key under which language packs publish themselves
pub const LANGUAGE_PACK_SERVICE: &str = "language-pack";

/// An implementation contributed to the shared built-in module namespace
pub type BuiltInModule = Arc<dyn Fn(serde_json::Value) -> serde_json::Value + Send + Sync>;

/// A source transpiler contributed under `runtime_features`
#[async_trait]
pub trait Transpiler: Send + Sync {
    /// Transpile `source` (identified by `path`) into evaluatable output.
    async fn transpile(&self, path: &str, source: &str) -> Result<String>;
}

/// Runtime feature bundle contributed by an activation
#[derive(Clone, Default)]
pub struct RuntimeFeatures {
    /// Optional transpiler callable
    pub transpiler: Option<Arc<dyn Transpiler>>,
    /// Additional feature flags
    pub flags: HashMap<String, serde_json::Value>,
}

/// Language pack descriptor published as the `language-pack` service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguagePack {
    /// BCP 47 primary subtag (e.g. "ja")
    pub locale: String,
    /// English name
    pub name: String,
    /// Name in the language itself
    pub native_name: String,
}

/// Value returned by an extension's `activate` hook
#[derive(Clone, Default)]
pub struct ExtensionActivation {
    /// Modules contributed to the global built-in namespace
    pub built_in_modules: IndexMap<String, BuiltInModule>,
    /// Runtime features (transpiler etc.)
    pub runtime_features: Option<RuntimeFeatures>,
    /// Named services; `language-pack` carries a [`LanguagePack`] value
    pub services: HashMap<String, serde_json::Value>,
    /// Free-form additional keys
    pub extra: HashMap<String, serde_json::Value>,
}

impl ExtensionActivation {
    /// Create an empty activation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a built-in module.
    pub fn with_built_in_module(
        mut self,
        name: impl Into<String>,
        module: BuiltInModule,
    ) -> Self {
        self.built_in_modules.insert(name.into(), module);
        self
    }

    /// Add a named service.
    pub fn with_service(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.services.insert(name.into(), value);
        self
    }

    /// Publish a language pack service.
    pub fn with_language_pack(self, pack: &LanguagePack) -> Self {
        let value = serde_json::to_value(pack).unwrap_or(serde_json::Value::Null);
        self.with_service(LANGUAGE_PACK_SERVICE, value)
    }

    /// Set runtime features.
    pub fn with_runtime_features(mut self, features: RuntimeFeatures) -> Self {
        self.runtime_features = Some(features);
        self
    }

    /// The language pack published by this activation, if any.
    pub fn language_pack(&self) -> Option<LanguagePack> {
        let value = self.services.get(LANGUAGE_PACK_SERVICE)?;
        serde_json::from_value(value.clone()).ok()
    }
}

impl std::fmt::Debug for ExtensionActivation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionActivation")
            .field(
                "built_in_modules",
                &self.built_in_modules.keys().collect::<Vec<_>>(),
            )
            .field("has_runtime_features", &self.runtime_features.is_some())
            .field("services", &self.services.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_pack_service() {
        let pack = LanguagePack {
            locale: "ja".to_string(),
            name: "Japanese".to_string(),
            native_name: "日本語".to_string(),
        };
        let activation = ExtensionActivation::new().with_language_pack(&pack);
        assert_eq!(activation.language_pack(), Some(pack));
    }

    #[test]
    fn test_language_pack_absent() {
        let activation = ExtensionActivation::new();
        assert_eq!(activation.language_pack(), None);
    }

    #[test]
    fn test_built_in_modules_keep_insertion_order() {
        let noop: BuiltInModule = Arc::new(|v| v);
        let activation = ExtensionActivation::new()
            .with_built_in_module("zeta", noop.clone())
            .with_built_in_module("alpha", noop);
        let keys: Vec<_> = activation.built_in_modules.keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }
}

//! Extension manifests and identity
//!
//! An extension is identified by a dotted id (`vendor.name`, or
//! `vendor.lang.xx` for language packs). The id is the sole identity and is
//! treated as an opaque key everywhere it appears.

use serde::{Deserialize, Serialize};

/// Extension identifier in dotted `vendor.name` form
pub type ExtensionId = String;

/// Kind of extension, as declared in its manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtensionKind {
    /// Contributes modules to the shared built-in namespace
    BuiltinModule,
    /// Provides a long-lived service (e.g. a language pack)
    Service,
    /// Provides a source transpiler
    Transpiler,
    /// Provides a language runtime
    LanguageRuntime,
    /// Provides a user-facing tool
    Tool,
    /// Contributes UI surfaces (tabs, panels)
    Ui,
}

/// Publish/update metadata carried by a manifest
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestMetadata {
    /// First publish timestamp (ISO 8601)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    /// Last update timestamp (ISO 8601)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Free-form tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Immutable descriptor of an extension
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionManifest {
    /// Extension identifier (e.g. "pyxis.markdown-preview")
    pub id: ExtensionId,
    /// Human-readable name
    pub name: String,
    /// Version (semver)
    pub version: String,
    /// Extension kind
    #[serde(rename = "type")]
    pub kind: ExtensionKind,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Relative path of the evaluatable entry asset within the package
    pub entry: String,
    /// Additional asset paths the extension expects at runtime
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    /// Ids of other extensions this one expects (advisory only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<ExtensionId>,
    /// Mutual-exclusion group: at most one enabled extension per group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub only_one: Option<String>,
    /// UI grouping metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pack_group: Option<String>,
    /// Publish/update metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ManifestMetadata>,
}

impl ExtensionManifest {
    /// The locale of a language-pack id (`<vendor>.lang.<locale>`), if any.
    pub fn lang_pack_locale(&self) -> Option<&str> {
        let mut parts = self.id.split('.');
        let _vendor = parts.next()?;
        if parts.next()? != "lang" {
            return None;
        }
        let locale = parts.next()?;
        if locale.is_empty() || parts.next().is_some() {
            return None;
        }
        Some(locale)
    }

    /// Package directory derived from the id.
    ///
    /// Language packs live under `lang-packs/<locale>`; everything else under
    /// the id with its vendor prefix stripped.
    pub fn package_dir(&self) -> String {
        if let Some(locale) = self.lang_pack_locale() {
            return format!("lang-packs/{}", locale);
        }
        match self.id.split_once('.') {
            Some((_vendor, rest)) => rest.to_string(),
            None => self.id.clone(),
        }
    }

    /// Basic structural validation: non-empty id, version and entry.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.id.is_empty() || !self.id.contains('.') {
            return Err(crate::error::ExtensionError::InvalidManifest(format!(
                "id must be a dotted identifier, got '{}'",
                self.id
            )));
        }
        if self.version.is_empty() {
            return Err(crate::error::ExtensionError::InvalidManifest(
                "version is required".to_string(),
            ));
        }
        if self.entry.is_empty() {
            return Err(crate::error::ExtensionError::InvalidManifest(
                "entry is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(id: &str) -> ExtensionManifest {
        ExtensionManifest {
            id: id.to_string(),
            name: "Test".to_string(),
            version: "1.0.0".to_string(),
            kind: ExtensionKind::Tool,
            description: None,
            author: None,
            entry: "index.js".to_string(),
            files: Vec::new(),
            dependencies: Vec::new(),
            only_one: None,
            pack_group: None,
            metadata: None,
        }
    }

    #[test]
    fn test_lang_pack_locale() {
        assert_eq!(manifest("pyxis.lang.ja").lang_pack_locale(), Some("ja"));
        assert_eq!(manifest("pyxis.lang.ja.extra").lang_pack_locale(), None);
        assert_eq!(manifest("pyxis.markdown").lang_pack_locale(), None);
    }

    #[test]
    fn test_package_dir() {
        assert_eq!(manifest("pyxis.lang.ja").package_dir(), "lang-packs/ja");
        assert_eq!(manifest("pyxis.markdown-preview").package_dir(), "markdown-preview");
        assert_eq!(manifest("vendor.tools.fmt").package_dir(), "tools.fmt");
    }

    #[test]
    fn test_manifest_wire_names() {
        let json = r#"{
            "id": "pyxis.lang.en",
            "name": "English",
            "version": "1.0.0",
            "type": "service",
            "entry": "index.js",
            "onlyOne": "lang-pack",
            "packGroup": "language"
        }"#;
        let m: ExtensionManifest = serde_json::from_str(json).unwrap();
        assert_eq!(m.kind, ExtensionKind::Service);
        assert_eq!(m.only_one.as_deref(), Some("lang-pack"));
        assert_eq!(m.pack_group.as_deref(), Some("language"));
    }

    #[test]
    fn test_validate() {
        assert!(manifest("pyxis.ok").validate().is_ok());
        assert!(manifest("no-dots").validate().is_err());

        let mut m = manifest("pyxis.ok");
        m.entry = String::new();
        assert!(m.validate().is_err());
    }
}

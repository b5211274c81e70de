//! ZIP ingestion of uploaded extension packages
//!
//! The archive may use any internal structure as long as a `manifest.json`
//! is discoverable. Its containing directory becomes the archive root, and
//! the manifest's `entry`/`files` paths are resolved against it.

use super::code::FetchedCode;
use crate::binary;
use pyxis_extension_sdk::error::{ExtensionError, Result};
use pyxis_extension_sdk::manifest::ExtensionManifest;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use tracing::{debug, warn};
use zip::ZipArchive;

/// A package extracted from an uploaded archive
#[derive(Debug, Clone)]
pub struct ZipPackage {
    /// The parsed manifest, with `entry` normalized to its package-relative form
    pub manifest: ExtensionManifest,
    /// Entry source and assets, post-conditions identical to the HTTP path
    pub code: FetchedCode,
}

/// Extract an extension package from ZIP bytes.
pub fn install_from_zip(bytes: &[u8]) -> Result<ZipPackage> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtensionError::archive(format!("failed to open zip: {}", e)))?;

    // Entry names in archive order; file_names() does not preserve it.
    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|e| ExtensionError::archive(format!("failed to read zip entry: {}", e)))?;
        names.push(entry.name().to_string());
    }

    let manifest_name = find_manifest(&names).ok_or_else(|| {
        ExtensionError::archive("archive does not contain a manifest.json".to_string())
    })?;
    let root = match manifest_name.rsplit_once('/') {
        Some((dir, _)) => format!("{}/", dir),
        None => String::new(),
    };

    let manifest_bytes = read_entry(&mut archive, &manifest_name)?;
    let mut manifest: ExtensionManifest = serde_json::from_slice(&manifest_bytes)
        .map_err(|e| ExtensionError::InvalidManifest(format!("manifest.json: {}", e)))?;
    manifest.validate()?;

    let entry_name = resolve_path(&names, &root, &manifest.entry).ok_or_else(|| {
        ExtensionError::MissingEntry(format!("'{}' not found in archive", manifest.entry))
    })?;
    let entry_code = String::from_utf8_lossy(&read_entry(&mut archive, &entry_name)?).into_owned();
    manifest.entry = package_relative(&entry_name, &root);

    let mut files = HashMap::new();
    let declared = std::mem::take(&mut manifest.files);
    for path in &declared {
        let Some(resolved) = resolve_path(&names, &root, path) else {
            warn!("Declared file '{}' not found in archive", path);
            continue;
        };
        let contents = read_entry(&mut archive, &resolved)?;
        let relative = package_relative(&resolved, &root);
        let value = if binary::is_binary(&relative) {
            binary::bytes_to_data_url(&contents, Some(&relative))
        } else {
            String::from_utf8_lossy(&contents).into_owned()
        };
        files.insert(relative, value);
    }
    if !declared.is_empty() && files.is_empty() {
        return Err(ExtensionError::archive(
            "none of the declared files resolve in the archive".to_string(),
        ));
    }
    manifest.files = files.keys().cloned().collect();
    manifest.files.sort();

    debug!(
        "Extracted {} from archive (root '{}', {} files)",
        manifest.id,
        root,
        files.len()
    );

    Ok(ZipPackage {
        manifest,
        code: FetchedCode { entry_code, files },
    })
}

/// Locate manifest.json: prefer the archive root, else the first occurrence.
fn find_manifest(names: &[String]) -> Option<String> {
    if names.iter().any(|n| n == "manifest.json") {
        return Some("manifest.json".to_string());
    }
    names
        .iter()
        .find(|n| n.ends_with("/manifest.json"))
        .cloned()
}

/// Resolve a declared path against the archive.
///
/// Tries the literal, `./`-prefixed and leading-slash-stripped forms, each
/// with and without the archive-root prefix.
fn resolve_path(names: &[String], root: &str, declared: &str) -> Option<String> {
    let stripped = declared.trim_start_matches("./").trim_start_matches('/');
    let bases = [
        declared.to_string(),
        format!("./{}", declared),
        stripped.to_string(),
    ];

    let mut candidates = Vec::new();
    for base in &bases {
        candidates.push(format!("{}{}", root, base));
        candidates.push(base.clone());
    }
    candidates.dedup();

    candidates
        .into_iter()
        .find(|candidate| names.iter().any(|n| n == candidate))
}

/// Strip the archive-root prefix and any `./` / leading-slash decoration.
fn package_relative(name: &str, root: &str) -> String {
    name.strip_prefix(root)
        .unwrap_or(name)
        .trim_start_matches("./")
        .trim_start_matches('/')
        .to_string()
}

fn read_entry(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<Vec<u8>> {
    let mut entry = archive
        .by_name(name)
        .map_err(|e| ExtensionError::archive(format!("failed to read '{}': {}", name, e)))?;
    let mut contents = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut contents)?;
    Ok(contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::{SimpleFileOptions, ZipWriter};

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, contents) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(contents).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    const MANIFEST: &str = r#"{
        "id": "a.zipped",
        "name": "Zipped",
        "version": "1.0.0",
        "type": "tool",
        "entry": "src/main.js",
        "files": ["assets/logo.png"]
    }"#;

    #[test]
    fn test_nested_root() {
        let bytes = build_zip(&[
            ("pkg/manifest.json", MANIFEST.as_bytes()),
            ("pkg/src/main.js", b"export const activate = () => ({});"),
            ("pkg/assets/logo.png", &[1, 2, 3]),
        ]);

        let package = install_from_zip(&bytes).unwrap();
        assert_eq!(package.manifest.id, "a.zipped");
        assert_eq!(package.manifest.entry, "src/main.js");
        assert!(package.code.entry_code.contains("activate"));

        let logo = &package.code.files["assets/logo.png"];
        assert!(logo.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_root_manifest_preferred() {
        let nested = MANIFEST.replace("a.zipped", "a.nested");
        let bytes = build_zip(&[
            ("deep/manifest.json", nested.as_bytes()),
            ("manifest.json", MANIFEST.replace("src/main.js", "main.js").as_bytes()),
            ("main.js", b"export const activate = () => ({});"),
            ("assets/logo.png", &[9]),
        ]);

        let package = install_from_zip(&bytes).unwrap();
        assert_eq!(package.manifest.id, "a.zipped");
    }

    #[test]
    fn test_missing_entry_is_fatal() {
        let bytes = build_zip(&[("pkg/manifest.json", MANIFEST.as_bytes())]);
        assert!(matches!(
            install_from_zip(&bytes),
            Err(ExtensionError::MissingEntry(_))
        ));
    }

    #[test]
    fn test_declared_files_none_resolve_fails() {
        let bytes = build_zip(&[
            ("pkg/manifest.json", MANIFEST.as_bytes()),
            ("pkg/src/main.js", b"export const activate = () => ({});"),
        ]);
        assert!(matches!(
            install_from_zip(&bytes),
            Err(ExtensionError::Archive(_))
        ));
    }

    #[test]
    fn test_decorated_paths_resolve() {
        let decorated = MANIFEST
            .replace("src/main.js", "./src/main.js")
            .replace("assets/logo.png", "/assets/logo.png");
        let bytes = build_zip(&[
            ("pkg/manifest.json", decorated.as_bytes()),
            ("pkg/src/main.js", b"export const activate = () => ({});"),
            ("pkg/assets/logo.png", &[4, 5]),
        ]);

        let package = install_from_zip(&bytes).unwrap();
        assert_eq!(package.manifest.entry, "src/main.js");
        assert!(package.code.files.contains_key("assets/logo.png"));
    }
}

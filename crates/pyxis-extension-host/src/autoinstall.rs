//! First-run bootstrap
//!
//! When the store holds no records, the manager hands off here: fetch the
//! registry, install and enable every `defaultEnabled` entry, then the
//! language pack matching the detected locale. Each step is isolated so one
//! failure does not abort the others.

use crate::config::RuntimeConfig;
use crate::manager::ExtensionManager;
use tracing::{info, warn};

/// Fallback locale when nothing can be detected
const DEFAULT_LOCALE: &str = "en";

/// Reduce a language tag to its primary subtag (`ja-JP` → `ja`).
fn primary_subtag(tag: &str) -> Option<String> {
    let primary = tag
        .split(['-', '_', '.'])
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    if primary.is_empty() || !primary.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some(primary)
}

/// Detect the UI locale: config override first, then the host environment.
pub fn detect_locale(config: &RuntimeConfig) -> String {
    if let Some(locale) = &config.locale {
        if let Some(primary) = primary_subtag(locale) {
            return primary;
        }
    }
    for var in ["LC_ALL", "LANG", "LANGUAGE"] {
        if let Ok(value) = std::env::var(var) {
            if let Some(primary) = primary_subtag(&value) {
                return primary;
            }
        }
    }
    DEFAULT_LOCALE.to_string()
}

/// Run the first-time setup against the given manager.
pub async fn run(manager: &ExtensionManager) {
    let installed = manager.installed_extensions().await;
    if !installed.is_empty() {
        return;
    }

    let Some(index) = manager.registry().fetch_registry(false).await else {
        warn!("First-time setup skipped, registry unavailable");
        return;
    };

    let locale = detect_locale(manager.config());
    info!("Running first-time setup (locale '{}')", locale);

    for entry in index.default_enabled() {
        if manager.install_extension(&entry.manifest_url).await.is_none() {
            warn!("Default install of {} failed", entry.id);
            continue;
        }
        if !manager.enable(&entry.id).await {
            warn!("Default enable of {} failed", entry.id);
        }
    }

    let needle = format!("lang-packs/{}/", locale);
    if let Some(entry) = index
        .extensions
        .iter()
        .find(|e| e.manifest_url.contains(&needle))
    {
        if manager.install_extension(&entry.manifest_url).await.is_none() {
            warn!("Language pack install for '{}' failed", locale);
        } else if !manager.enable(&entry.id).await {
            warn!("Language pack enable for '{}' failed", locale);
        }
    } else {
        info!("No language pack in registry for '{}'", locale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_subtag() {
        assert_eq!(primary_subtag("ja-JP").as_deref(), Some("ja"));
        assert_eq!(primary_subtag("ja_JP.UTF-8").as_deref(), Some("ja"));
        assert_eq!(primary_subtag("EN").as_deref(), Some("en"));
        assert_eq!(primary_subtag("C.UTF-8").as_deref(), Some("c"));
        assert_eq!(primary_subtag(""), None);
    }

    #[test]
    fn test_detect_locale_prefers_config() {
        let config = RuntimeConfig {
            locale: Some("ja-JP".to_string()),
            ..Default::default()
        };
        assert_eq!(detect_locale(&config), "ja");
    }
}

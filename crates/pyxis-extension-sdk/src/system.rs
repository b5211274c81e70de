//! System module interfaces
//!
//! External collaborators of the runtime (the virtual filesystem, path
//! utilities, terminal commands, the module normalizer) are surfaced to
//! extensions through `getSystemModule`. The host IDE implements these
//! traits and injects them at manager construction; the command registry is
//! the host crate's own type and joins the closed set there.

use crate::error::Result;
use async_trait::async_trait;

/// File repository collaborator (the browser virtual filesystem)
#[async_trait]
pub trait FileRepository: Send + Sync {
    /// Read a file's contents.
    async fn read_file(&self, path: &str) -> Result<Vec<u8>>;

    /// Write a file, creating parents as needed.
    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<()>;

    /// List the entries of a directory.
    async fn list_dir(&self, path: &str) -> Result<Vec<String>>;

    /// Whether a path exists.
    async fn exists(&self, path: &str) -> Result<bool>;
}

/// Path utility collaborator
pub trait PathUtils: Send + Sync {
    /// Join a relative segment onto a base path.
    fn join(&self, base: &str, rel: &str) -> String;

    /// The parent directory of a path.
    fn dirname(&self, path: &str) -> String;

    /// The extension of a path, without the dot.
    fn extension(&self, path: &str) -> Option<String>;
}

/// Slash-separated path utilities matching the IDE's virtual filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct VirtualPathUtils;

impl PathUtils for VirtualPathUtils {
    fn join(&self, base: &str, rel: &str) -> String {
        if base.is_empty() {
            return rel.trim_start_matches('/').to_string();
        }
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            rel.trim_start_matches('/')
        )
    }

    fn dirname(&self, path: &str) -> String {
        match path.trim_end_matches('/').rsplit_once('/') {
            Some((dir, _)) => dir.to_string(),
            None => String::new(),
        }
    }

    fn extension(&self, path: &str) -> Option<String> {
        let name = path.rsplit('/').next()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_string())
    }
}

/// Built-in terminal command singletons
#[async_trait]
pub trait TerminalCommands: Send + Sync {
    /// Run a built-in command and return its output.
    async fn run(&self, command: &str, args: &[String]) -> Result<String>;
}

/// Normalizes CommonJS/ESM source so it can be evaluated as a module
pub trait ModuleNormalizer: Send + Sync {
    /// Rewrite `source` into the module dialect the loader evaluates.
    fn normalize(&self, source: &str) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_path_utils_join() {
        let p = VirtualPathUtils;
        assert_eq!(p.join("a/b", "c.txt"), "a/b/c.txt");
        assert_eq!(p.join("a/b/", "/c.txt"), "a/b/c.txt");
        assert_eq!(p.join("", "/c.txt"), "c.txt");
    }

    #[test]
    fn test_virtual_path_utils_dirname() {
        let p = VirtualPathUtils;
        assert_eq!(p.dirname("a/b/c.txt"), "a/b");
        assert_eq!(p.dirname("c.txt"), "");
    }

    #[test]
    fn test_virtual_path_utils_extension() {
        let p = VirtualPathUtils;
        assert_eq!(p.extension("a/b/c.txt").as_deref(), Some("txt"));
        assert_eq!(p.extension("a/b/.gitignore"), None);
        assert_eq!(p.extension("a/b/noext"), None);
    }
}

//! Project version lookup from the WordPress descriptor header.
//!
//! Plugins declare `Version:` in the header comment of `<name>.php`; themes
//! declare it in `style.css`. Missing or unreadable descriptors are not an
//! error: the archive simply carries an empty version.

use std::path::{Path, PathBuf};

/// Descriptor files probed in order.
fn descriptor_candidates(source_root: &Path, project_name: &str) -> [PathBuf; 2] {
    [
        source_root.join(format!("{project_name}.php")),
        source_root.join("style.css"),
    ]
}

/// Version of the project at `source_root`, or `""` when none is declared.
pub fn extract_version(source_root: &Path, project_name: &str) -> String {
    for path in descriptor_candidates(source_root, project_name) {
        let Ok(content) = std::fs::read_to_string(&path) else {
            continue;
        };
        if let Some(version) = parse_version_header(&content) {
            tracing::debug!(path = %path.display(), version = %version, "project version found");
            return version;
        }
    }
    tracing::debug!(root = %source_root.display(), "no project version declared");
    String::new()
}

/// Find the first `Version:` header field and return its value with all
/// whitespace removed.
pub fn parse_version_header(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let field = line
            .trim_start()
            .trim_start_matches(['*', '/', '#'])
            .trim_start();
        let (key, value) = field.split_once(':')?;
        if !key.trim().eq_ignore_ascii_case("version") {
            return None;
        }
        let version: String = value.chars().filter(|c| !c.is_whitespace()).collect();
        (!version.is_empty()).then_some(version)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PLUGIN_HEADER: &str = "<?php\n/**\n * Plugin Name: My Plugin\n * Requires PHP: 7.4\n * Version:           1.4.2\n * Author: Someone\n */\n";

    #[test]
    fn reads_plugin_header() {
        assert_eq!(parse_version_header(PLUGIN_HEADER).as_deref(), Some("1.4.2"));
    }

    #[test]
    fn strips_embedded_whitespace() {
        assert_eq!(
            parse_version_header("Version: 2.0 beta 1").as_deref(),
            Some("2.0beta1")
        );
    }

    #[test]
    fn ignores_similar_keys_and_empty_values() {
        assert_eq!(parse_version_header("Requires at least: 6.0\n"), None);
        assert_eq!(parse_version_header(" * Version:   \n"), None);
    }

    #[test]
    fn plugin_descriptor_wins_over_stylesheet() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("my-plugin.php"), PLUGIN_HEADER).unwrap();
        std::fs::write(tmp.path().join("style.css"), "/*\nVersion: 9.9\n*/").unwrap();
        assert_eq!(extract_version(tmp.path(), "my-plugin"), "1.4.2");
    }

    #[test]
    fn theme_stylesheet_is_used_as_fallback() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("style.css"),
            "/*\nTheme Name: Fun\nVersion: 3.1\n*/\nbody{}",
        )
        .unwrap();
        assert_eq!(extract_version(tmp.path(), "fun"), "3.1");
    }

    #[test]
    fn missing_descriptor_yields_empty_version() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(extract_version(tmp.path(), "ghost"), "");
    }
}

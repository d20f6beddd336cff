//! Code style and tab settings, plus `patina.toml` loading.
//!
//! The indentation engine reports depths as unit counts; everything about how
//! units become whitespace, and which syntactic constructs indent at all,
//! lives here. The flag set mirrors the classic Qt style configuration
//! surface so existing muscle memory (and config files) transfer directly.
//!
//! Unknown TOML fields are ignored (deserialization tolerance) so the file
//! format can grow without breaking older binaries.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::info;

/// How indent and continuation units map to columns/whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TabSettings {
    /// Display width of a tab character.
    pub tab_size: usize,
    /// Columns per structural indent unit.
    pub indent_size: usize,
    /// Columns per continuation-padding unit.
    pub continuation_size: usize,
    /// Emit spaces only; tabs are never produced when set.
    pub spaces_only: bool,
}

impl Default for TabSettings {
    fn default() -> Self {
        Self {
            tab_size: 4,
            indent_size: 4,
            continuation_size: 4,
            spaces_only: true,
        }
    }
}

impl TabSettings {
    /// Total display column for a depth pair.
    pub fn columns(&self, indent: i32, padding: i32) -> usize {
        let indent = indent.max(0) as usize;
        let padding = padding.max(0) as usize;
        indent * self.indent_size + padding * self.continuation_size
    }

    /// Render a depth pair to leading whitespace.
    pub fn indentation_string(&self, indent: i32, padding: i32) -> String {
        let columns = self.columns(indent, padding);
        if self.spaces_only || self.tab_size == 0 {
            " ".repeat(columns)
        } else {
            let tabs = columns / self.tab_size;
            let spaces = columns % self.tab_size;
            let mut s = "\t".repeat(tabs);
            s.push_str(&" ".repeat(spaces));
            s
        }
    }
}

/// Which constructs indent, and by how much. Defaults follow the Qt style:
/// function/block bodies indent, namespace bodies and all braces do not,
/// switch statements indent relative to their case labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CodeStyleSettings {
    pub indent_block_braces: bool,
    pub indent_block_body: bool,
    pub indent_class_braces: bool,
    pub indent_enum_braces: bool,
    pub indent_namespace_braces: bool,
    pub indent_namespace_body: bool,
    pub indent_access_specifiers: bool,
    pub indent_declarations_relative_to_access_specifiers: bool,
    pub indent_function_body: bool,
    pub indent_function_braces: bool,
    pub indent_switch_labels: bool,
    pub indent_statements_relative_to_switch_labels: bool,
    pub indent_blocks_relative_to_switch_labels: bool,
    pub indent_control_flow_relative_to_switch_labels: bool,
    /// Give wrapped conditions a second padding unit so their continuation
    /// does not line up with the indented body that follows.
    pub extra_padding_for_conditions_if_confusing_align: bool,
    /// Accepted for config compatibility; alignment to an `=` column is not
    /// representable in unit depths, so this flag currently has no effect.
    pub align_assignments: bool,
}

impl Default for CodeStyleSettings {
    fn default() -> Self {
        Self {
            indent_block_braces: false,
            indent_block_body: true,
            indent_class_braces: false,
            indent_enum_braces: false,
            indent_namespace_braces: false,
            indent_namespace_body: false,
            indent_access_specifiers: false,
            indent_declarations_relative_to_access_specifiers: true,
            indent_function_body: true,
            indent_function_braces: false,
            indent_switch_labels: false,
            indent_statements_relative_to_switch_labels: true,
            indent_blocks_relative_to_switch_labels: false,
            indent_control_flow_relative_to_switch_labels: false,
            extra_padding_for_conditions_if_confusing_align: true,
            align_assignments: false,
        }
    }
}

/// On-disk configuration file shape.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ConfigFile {
    pub style: CodeStyleSettings,
    pub tabs: TabSettings,
}

/// Loaded configuration: parsed data plus provenance for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub file: ConfigFile,
    pub source: Option<PathBuf>,
}

impl Config {
    pub fn style(&self) -> CodeStyleSettings {
        self.file.style
    }

    pub fn tabs(&self) -> TabSettings {
        self.file.tabs
    }
}

const CONFIG_FILE_NAME: &str = "patina.toml";

/// Load configuration from an explicit path.
pub fn load_from(path: &PathBuf) -> Result<Config> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    let file: ConfigFile = toml::from_str(&raw)
        .with_context(|| format!("parsing config file {}", path.display()))?;
    info!(path = %path.display(), "loaded configuration");
    Ok(Config {
        file,
        source: Some(path.clone()),
    })
}

/// Discover a `patina.toml`: current directory first, then the user config
/// directory. Returns defaults when none exists; a file that exists but does
/// not parse is an error (silently ignoring a broken config hides mistakes).
pub fn discover() -> Result<Config> {
    let mut candidates = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("patina").join(CONFIG_FILE_NAME));
    }
    for candidate in candidates {
        if candidate.is_file() {
            return load_from(&candidate);
        }
    }
    info!("no configuration file found, using defaults");
    Ok(Config::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_qt_style() {
        let style = CodeStyleSettings::default();
        assert!(style.indent_function_body);
        assert!(!style.indent_namespace_body);
        assert!(!style.indent_class_braces);
        assert!(style.indent_statements_relative_to_switch_labels);
        assert!(style.extra_padding_for_conditions_if_confusing_align);
    }

    #[test]
    fn indentation_string_spaces() {
        let tabs = TabSettings::default();
        assert_eq!(tabs.indentation_string(2, 0), "        ");
        assert_eq!(tabs.indentation_string(1, 1), "        ");
        assert_eq!(tabs.indentation_string(0, 0), "");
    }

    #[test]
    fn indentation_string_with_tabs() {
        let tabs = TabSettings {
            tab_size: 4,
            indent_size: 4,
            continuation_size: 2,
            spaces_only: false,
        };
        assert_eq!(tabs.indentation_string(1, 1), "\t  ");
    }

    #[test]
    fn negative_depths_clamp_to_zero() {
        let tabs = TabSettings::default();
        assert_eq!(tabs.indentation_string(-3, -1), "");
    }

    #[test]
    fn load_partial_file_keeps_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            f,
            "[style]\nindent_namespace_body = true\n\n[tabs]\nindent_size = 2"
        )
        .unwrap();
        let cfg = load_from(&f.path().to_path_buf()).unwrap();
        assert!(cfg.style().indent_namespace_body);
        assert!(cfg.style().indent_function_body); // untouched default
        assert_eq!(cfg.tabs().indent_size, 2);
        assert_eq!(cfg.tabs().tab_size, 4); // untouched default
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[style]\nfuture_flag = true\n[future_section]\nx = 1").unwrap();
        let cfg = load_from(&f.path().to_path_buf()).unwrap();
        assert_eq!(cfg.style(), CodeStyleSettings::default());
    }

    #[test]
    fn broken_file_is_an_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[style\nnot toml").unwrap();
        assert!(load_from(&f.path().to_path_buf()).is_err());
    }
}

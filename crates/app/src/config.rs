use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tally_core::SignConvention;
use tally_rules::ExactMatchMode;

pub const DEFAULT_CONFIG_FILE: &str = "tally.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Rule-set file (JSON or TOML). Relative paths resolve against the
    /// directory holding the config file.
    pub rules: Option<PathBuf>,
    pub sign_convention: SignConvention,
    pub exact_mode: ExactMatchMode,
    /// Year applied to `MM/DD` statement dates.
    pub default_year: Option<i32>,
    /// Tried before the built-in date formats.
    pub date_format: Option<String>,
}

/// Loads `explicit` if given (it must exist), otherwise `./tally.toml` when
/// present, otherwise defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let path = match explicit {
        Some(p) if !p.exists() => bail!("Config not found: {}", p.display()),
        Some(p) => p.to_path_buf(),
        None => {
            let p = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !p.exists() {
                return Ok(AppConfig::default());
            }
            p
        }
    };
    read_config(&path)
}

fn read_config(path: &Path) -> Result<AppConfig> {
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let mut cfg: AppConfig =
        toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?;

    if let (Some(rules), Some(dir)) = (cfg.rules.as_ref(), path.parent()) {
        if rules.is_relative() {
            cfg.rules = Some(dir.join(rules));
        }
    }
    tracing::debug!(path = %path.display(), "Loaded app config");
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_config_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.toml");
        fs::write(
            &path,
            r#"
rules = "rules.json"
sign_convention = "kind_flag"
exact_mode = "whole_word"
default_year = 2024
"#,
        )
        .unwrap();

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.rules, Some(dir.path().join("rules.json")));
        assert_eq!(cfg.sign_convention, SignConvention::KindFlag);
        assert_eq!(cfg.exact_mode, ExactMatchMode::WholeWord);
        assert_eq!(cfg.default_year, Some(2024));
        assert_eq!(cfg.date_format, None);
    }

    #[test]
    fn missing_keys_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.toml");
        fs::write(&path, "default_year = 2023\n").unwrap();

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.rules, None);
        assert_eq!(cfg.sign_convention, SignConvention::Signed);
        assert_eq!(cfg.exact_mode, ExactMatchMode::Substring);
    }

    #[test]
    fn absolute_rules_path_kept() {
        let dir = tempfile::tempdir().unwrap();
        let rules = dir.path().join("elsewhere").join("rules.toml");
        let path = dir.path().join("tally.toml");
        fs::write(&path, format!("rules = {:?}\n", rules.display().to_string())).unwrap();

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.rules, Some(rules));
    }

    #[test]
    fn explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn bad_value_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.toml");
        fs::write(&path, "sign_convention = \"sideways\"\n").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }
}

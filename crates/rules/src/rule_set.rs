use std::fmt;
use std::path::{Path, PathBuf};

use regex::{Regex, RegexBuilder};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tally_core::FALLBACK_CATEGORY;
use thiserror::Error;

use crate::normalize::{contains_whole_word, normalize};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read rule set {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse JSON rule set: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to parse TOML rule set: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Category name must not be empty")]
    EmptyName,
    #[error("Duplicate category: '{0}'")]
    DuplicateCategory(String),
    #[error("Category '{0}' has no exact, fuzzy or regex terms")]
    EmptyRule(String),
    #[error("'{0}' is reserved for the fallback category")]
    ReservedName(String),
}

/// A regex that failed to compile. The owning category keeps its exact and
/// fuzzy tiers but its regex tier is disabled for the run.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("Invalid regex '{pattern}' in category '{category}': {message}")]
pub struct InvalidPatternWarning {
    pub category: String,
    pub pattern: String,
    pub message: String,
}

/// How exact-tier terms are located inside a description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExactMatchMode {
    /// Term may appear anywhere, e.g. `starbucks` in `starbucks#123`.
    #[default]
    Substring,
    /// Term must be bounded by non-alphanumeric characters.
    WholeWord,
}

impl std::str::FromStr for ExactMatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "substring" => Ok(ExactMatchMode::Substring),
            "whole_word" | "word" => Ok(ExactMatchMode::WholeWord),
            other => Err(format!("Unknown exact match mode: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatchOptions {
    #[serde(default)]
    pub exact_mode: ExactMatchMode,
}

/// One category as written in a rule-set file.
///
/// Accepts either the tiered form `{exact, fuzzy, regex}` (missing lists
/// default to empty, unknown keys are ignored) or a plain list of terms,
/// which is read as exact terms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawDefinition")]
pub struct RuleDefinition {
    pub exact: Vec<String>,
    pub fuzzy: Vec<String>,
    pub regex: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDefinition {
    Terms(Vec<String>),
    Tiers {
        #[serde(default)]
        exact: Vec<String>,
        #[serde(default)]
        fuzzy: Vec<String>,
        #[serde(default)]
        regex: Vec<String>,
    },
}

impl From<RawDefinition> for RuleDefinition {
    fn from(raw: RawDefinition) -> Self {
        match raw {
            RawDefinition::Terms(exact) => RuleDefinition {
                exact,
                ..Default::default()
            },
            RawDefinition::Tiers { exact, fuzzy, regex } => RuleDefinition { exact, fuzzy, regex },
        }
    }
}

impl RuleDefinition {
    pub fn exact<I: IntoIterator<Item = S>, S: Into<String>>(terms: I) -> Self {
        RuleDefinition {
            exact: terms.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn fuzzy<I: IntoIterator<Item = S>, S: Into<String>>(terms: I) -> Self {
        RuleDefinition {
            fuzzy: terms.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn regex<I: IntoIterator<Item = S>, S: Into<String>>(patterns: I) -> Self {
        RuleDefinition {
            regex: patterns.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }
}

/// Category definitions in file order. Duplicate names are kept so that
/// validation can reject them instead of silently keeping the last one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSource(pub Vec<(String, RuleDefinition)>);

impl<'de> Deserialize<'de> for RuleSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = RuleSource;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of category name to rule definition")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, RuleDefinition>()? {
                    entries.push(entry);
                }
                Ok(RuleSource(entries))
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

impl Serialize for RuleSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, def) in &self.0 {
            map.serialize_entry(name, def)?;
        }
        map.end()
    }
}

impl RuleSource {
    /// Starter categories written out by `tally template`.
    pub fn template() -> Self {
        let entry = |name: &str, exact: &[&str], fuzzy: &[&str], regex: &[&str]| {
            let to_vec = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
            (
                name.to_string(),
                RuleDefinition {
                    exact: to_vec(exact),
                    fuzzy: to_vec(fuzzy),
                    regex: to_vec(regex),
                },
            )
        };
        RuleSource(vec![
            entry(
                "Food & Dining",
                &["restaurant", "cafe", "pizza", "mcdonald", "starbucks", "subway"],
                &["dining", "food", "lunch", "dinner"],
                &[r".*restaurant.*", r".*cafe.*"],
            ),
            entry(
                "Transportation",
                &["gas", "fuel", "uber", "lyft", "taxi", "parking"],
                &["transport", "travel"],
                &[r".*gas.*station.*", r".*parking.*"],
            ),
            entry(
                "Shopping",
                &["amazon", "walmart", "target", "costco", "mall"],
                &["shopping", "store"],
                &[r".*shop.*", r".*store.*"],
            ),
            entry(
                "Utilities",
                &["electric", "water", "gas bill", "internet", "phone"],
                &["utility", "bill"],
                &[r".*electric.*company.*", r".*water.*dept.*"],
            ),
            entry(
                "Healthcare",
                &["hospital", "pharmacy", "doctor", "medical"],
                &["health", "medical"],
                &[r".*medical.*", r".*pharmacy.*"],
            ),
        ])
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A validated category: normalized terms plus compiled patterns.
#[derive(Debug, Clone)]
pub struct CategoryRule {
    name: String,
    exact_terms: Vec<String>,
    fuzzy_terms: Vec<String>,
    regex_patterns: Vec<Regex>,
    regex_enabled: bool,
}

impl CategoryRule {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn exact_terms(&self) -> &[String] {
        &self.exact_terms
    }

    pub fn fuzzy_terms(&self) -> &[String] {
        &self.fuzzy_terms
    }

    pub fn regex_patterns(&self) -> &[Regex] {
        &self.regex_patterns
    }

    /// False when one of the category's patterns failed to compile.
    pub fn regex_enabled(&self) -> bool {
        self.regex_enabled
    }

    /// `text` must already be normalized.
    pub fn matches_exact(&self, text: &str, mode: ExactMatchMode) -> bool {
        self.exact_terms.iter().any(|term| match mode {
            ExactMatchMode::Substring => text.contains(term.as_str()),
            ExactMatchMode::WholeWord => contains_whole_word(text, term),
        })
    }

    /// Bidirectional containment: the term inside the description, or the
    /// whole description inside the term (abbreviated merchant names).
    /// `text` must already be normalized.
    pub fn matches_fuzzy(&self, text: &str) -> bool {
        self.fuzzy_terms
            .iter()
            .any(|term| text.contains(term.as_str()) || (!text.is_empty() && term.contains(text)))
    }

    /// `text` must already be normalized.
    pub fn matches_regex(&self, text: &str) -> bool {
        self.regex_enabled && self.regex_patterns.iter().any(|re| re.is_match(text))
    }
}

/// Ordered, validated category rules. Immutable once built; share it by
/// reference across every categorization in a run.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CategoryRule>,
    warnings: Vec<InvalidPatternWarning>,
    options: MatchOptions,
}

impl RuleSet {
    pub fn from_definitions<I>(definitions: I, options: MatchOptions) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, RuleDefinition)>,
    {
        let mut rules: Vec<CategoryRule> = Vec::new();
        let mut warnings = Vec::new();

        for (raw_name, def) in definitions {
            let name = raw_name.trim().to_string();
            if name.is_empty() {
                return Err(ConfigError::EmptyName);
            }
            if name.eq_ignore_ascii_case(FALLBACK_CATEGORY) {
                return Err(ConfigError::ReservedName(name));
            }
            if rules.iter().any(|r| r.name == name) {
                return Err(ConfigError::DuplicateCategory(name));
            }

            let exact_terms = normalize_terms(&def.exact);
            let fuzzy_terms = normalize_terms(&def.fuzzy);
            let patterns: Vec<&str> = def
                .regex
                .iter()
                .map(String::as_str)
                .filter(|p| !p.trim().is_empty())
                .collect();

            if exact_terms.is_empty() && fuzzy_terms.is_empty() && patterns.is_empty() {
                return Err(ConfigError::EmptyRule(name));
            }

            let mut regex_patterns = Vec::with_capacity(patterns.len());
            let mut regex_enabled = true;
            for pattern in patterns {
                match RegexBuilder::new(pattern).case_insensitive(true).build() {
                    Ok(re) => regex_patterns.push(re),
                    Err(e) => {
                        tracing::warn!(
                            category = %name,
                            pattern,
                            "Invalid regex pattern, regex tier disabled for category: {e}"
                        );
                        warnings.push(InvalidPatternWarning {
                            category: name.clone(),
                            pattern: pattern.to_string(),
                            message: e.to_string(),
                        });
                        regex_enabled = false;
                    }
                }
            }
            if !regex_enabled {
                regex_patterns.clear();
            }

            rules.push(CategoryRule {
                name,
                exact_terms,
                fuzzy_terms,
                regex_patterns,
                regex_enabled,
            });
        }

        tracing::info!(
            categories = rules.len(),
            warnings = warnings.len(),
            "Loaded rule set"
        );
        Ok(Self {
            rules,
            warnings,
            options,
        })
    }

    pub fn from_source(source: RuleSource, options: MatchOptions) -> Result<Self, ConfigError> {
        Self::from_definitions(source.0, options)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let source: RuleSource = serde_json::from_str(content)?;
        Self::from_source(source, MatchOptions::default())
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let source: RuleSource = toml::from_str(content)?;
        Self::from_source(source, MatchOptions::default())
    }

    /// Reads a rule set from disk; `.toml` files are parsed as TOML,
    /// everything else as JSON.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Reading rule set");
        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    pub fn with_options(mut self, options: MatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    pub fn warnings(&self) -> &[InvalidPatternWarning] {
        &self.warnings
    }

    pub fn options(&self) -> MatchOptions {
        self.options
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(CategoryRule::name)
    }
}

fn normalize_terms(terms: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(terms.len());
    for term in terms.iter().map(|t| normalize(t)) {
        if !term.is_empty() && !out.contains(&term) {
            out.push(term);
        }
    }
    out
}

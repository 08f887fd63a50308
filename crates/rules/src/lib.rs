pub mod categorizer;
pub mod normalize;
pub mod rule_set;

pub use categorizer::{categorize, categorize_all, categorize_transaction, category_counts, Categorization};
pub use normalize::normalize;
pub use rule_set::{
    CategoryRule, ConfigError, ExactMatchMode, InvalidPatternWarning, MatchOptions, RuleDefinition,
    RuleSet, RuleSource,
};


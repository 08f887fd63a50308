pub mod aggregate;
pub mod pivot;
pub mod summary;

pub use aggregate::{aggregate, MonthlyAggregator};
pub use pivot::{CategoryPivot, PivotRow};
pub use summary::{AnalysisResult, CategorySummary, MonthBalance, MonthReport, OverallSummary};

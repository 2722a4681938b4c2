//! Survey analysis: prompts, the provider round trip, and turning the model's
//! reply into JSON and then into a fully populated report.

pub mod analyzer;
pub mod error;
pub mod parse;
pub mod prompts;
pub mod report;

pub use analyzer::{AnalyzerSettings, SurveyAnalysis, SurveyAnalyzer, SurveyUpload};
pub use error::AnalysisError;
pub use parse::extract_json;
pub use report::{chance_level_for, DrillingPoint, SurveyReport};

//! Form parsing: value normalization, era classification and pattern
//! extraction over recovered document text.

pub mod classify;
pub mod confidence;
pub mod normalize;
pub mod patterns;

pub use classify::{classify_era, FormEra};
pub use confidence::score_confidence;
pub use normalize::normalize_amount;
pub use patterns::{ParsedFinancials, PatternExtractor};

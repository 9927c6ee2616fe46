//! Quiz Confidence Analysis
//!
//! Scores how consistent a completed style quiz is and maps the score to
//! results-page messaging. Pure functions with no I/O; independent of the
//! product cache.

pub mod answers;
pub mod badge;
pub mod confidence;

pub use answers::QuizAnswers;
pub use badge::{
    confidence_banner, get_confidence_badge, should_show_ambiguity_warning, BadgeColor,
    BannerVariant, ConfidenceBadge, ConfidenceBanner,
};
pub use confidence::{analyze_quiz_confidence, ConfidenceAnalysis};

//! Quiz Confidence Analyzer
//!
//! Heuristic 0-100 score for how consistent a completed quiz is. Used for
//! results-page messaging only.
//!
//! Four sub-scores are computed independently:
//!
//! | Sub-score | Inputs | Scores |
//! |-----------|--------|--------|
//! | style | style, occasion, formality, personality answers | 45 / 55 / 70 / 85 |
//! | color | favorite colors, color preference, skin, hair, eye | 50 / 65 / 70 / 85 |
//! | visual | swipe records (`liked` or `action == "like"`) | 45 / 65 / 70 / 80 |
//! | timing | `_quiz_start_time`, `_quiz_end_time` (ms) | 40 / 60 / 85 |
//!
//! The overall score is the rounded mean of style, color and visual, plus
//! timing only when it is a penalty (below 50).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::answers::{coerce_number, is_truthy, QuizAnswers};

/// Overall scores below this are ambiguous
pub const AMBIGUITY_THRESHOLD: u8 = 60;

/// Sub-scores below this trigger a recommendation
pub const LOW_SCORE_THRESHOLD: u8 = 60;

/// Visual sub-scores below this trigger a recommendation
pub const LOW_VISUAL_THRESHOLD: u8 = 50;

/// Timing scores below this lower the overall score
pub const TIMING_PENALTY_THRESHOLD: u8 = 50;

const DEFAULT_SCORE: u8 = 70;

const STYLE_QUESTIONS: [&str; 4] = [
    "style_preference",
    "occasion_preference",
    "formality_level",
    "personality_traits",
];

const COLOR_QUESTIONS: [&str; 5] = [
    "favorite_colors",
    "color_preference",
    "skin_tone",
    "hair_color",
    "eye_color",
];

const SWIPE_QUESTIONS: [&str; 2] = ["visual_preferences", "mood_photo_swipes"];

const WARM_COLORS: [&str; 7] = ["warm", "yellow", "orange", "red", "gold", "brown", "beige"];
const COOL_COLORS: [&str; 7] = ["cool", "blue", "green", "purple", "silver", "grey", "pink"];

const QUIZ_START: &str = "_quiz_start_time";
const QUIZ_END: &str = "_quiz_end_time";

const MIN_EXPECTED_SECS: f64 = 60.0;
const MAX_EXPECTED_SECS: f64 = 600.0;

pub const RECOMMEND_ECLECTIC: &str =
    "Je stijl lijkt veelzijdig en eclectisch - dat betekent dat je in meerdere richtingen kunt!";
pub const RECOMMEND_COLOR: &str = "Je kleurvoorkeur is flexibel. Probeer zowel warme als koele kleuren uit om te zien wat je het beste staat.";
pub const RECOMMEND_STYLE: &str = "Je combineert elementen uit verschillende stijlen. Dit geeft je veel vrijheid in je kledingkeuzes!";
pub const RECOMMEND_VISUAL: &str =
    "Je visuele voorkeuren variëren sterk. We adviseren om verschillende looks uit te proberen.";

const EXPLAIN_CLEAR: &str = "Je hebt een duidelijk en consistent stijlprofiel. De aanbevelingen zijn specifiek afgestemd op jouw voorkeuren.";
const EXPLAIN_FLEXIBLE: &str = "Je stijl heeft wat variatie, wat betekent dat je flexibel bent in je kledingkeuzes. De aanbevelingen geven je een goede richting, maar experimenteer gerust!";
const EXPLAIN_VARIED_OPENING: &str = "Je resultaten tonen een veelzijdige stijl.";
const EXPLAIN_VARIED_CLOSING: &str =
    "Dit geeft je veel vrijheid om te experimenteren met verschillende looks!";
const EXPLAIN_STYLE_CLAUSE: &str = "Je combineert elementen uit verschillende stijlen";
const EXPLAIN_COLOR_CLAUSE: &str =
    "je kunt zowel in warme als koele kleuren stralen afhankelijk van de context";

/// Result of [`analyze_quiz_confidence`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceAnalysis {
    pub overall_confidence: u8,
    pub color_confidence: u8,
    pub style_confidence: u8,
    pub visual_confidence: u8,
    /// Absent when the quiz carried no usable timestamps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing_score: Option<u8>,
    /// `overall_confidence < 60`
    pub is_ambiguous: bool,
    pub recommendations: Vec<String>,
    pub explanation: String,
}

/// Score a completed quiz. Never fails; missing answers take defaults.
pub fn analyze_quiz_confidence(answers: &QuizAnswers) -> ConfidenceAnalysis {
    let style = style_consistency(answers);
    let color = color_consistency(answers);
    let visual = visual_consistency(answers);
    let timing = quiz_timing(answers);

    let mut scores = vec![style, color, visual];
    if let Some(t) = timing.filter(|t| *t < TIMING_PENALTY_THRESHOLD) {
        scores.push(t);
    }

    let sum: u32 = scores.iter().map(|s| u32::from(*s)).sum();
    let overall = (f64::from(sum) / scores.len() as f64).round() as u8;
    let is_ambiguous = overall < AMBIGUITY_THRESHOLD;

    let mut recommendations = Vec::new();
    if is_ambiguous {
        recommendations.push(RECOMMEND_ECLECTIC.to_string());
    }
    if color < LOW_SCORE_THRESHOLD {
        recommendations.push(RECOMMEND_COLOR.to_string());
    }
    if style < LOW_SCORE_THRESHOLD {
        recommendations.push(RECOMMEND_STYLE.to_string());
    }
    if visual < LOW_VISUAL_THRESHOLD {
        recommendations.push(RECOMMEND_VISUAL.to_string());
    }

    debug!(
        overall,
        style,
        color,
        visual,
        timing = ?timing,
        "Analyzed quiz confidence"
    );

    ConfidenceAnalysis {
        overall_confidence: overall,
        color_confidence: color,
        style_confidence: style,
        visual_confidence: visual,
        timing_score: timing,
        is_ambiguous,
        recommendations,
        explanation: explanation(overall, style, color),
    }
}

/// Contradictory or mixed style keywords lower the score; two or more
/// answers leaning the same way raise it.
fn style_consistency(answers: &QuizAnswers) -> u8 {
    let texts = answers.truthy_texts(&STYLE_QUESTIONS);
    if texts.is_empty() {
        return DEFAULT_SCORE;
    }

    let minimalist = texts.iter().any(|t| t.contains("minimalist"));
    let maximalist = texts
        .iter()
        .any(|t| t.contains("bold") || t.contains("statement"));
    if minimalist && maximalist {
        return 45;
    }

    let casual = count_matching(&texts, &["casual", "relaxed"]);
    let formal = count_matching(&texts, &["formal", "professional"]);

    if casual > 0 && casual == formal {
        55
    } else if casual >= 2 || formal >= 2 {
        85
    } else {
        DEFAULT_SCORE
    }
}

/// Warm versus cool keywords across the color answers.
fn color_consistency(answers: &QuizAnswers) -> u8 {
    let texts = answers.truthy_texts(&COLOR_QUESTIONS);
    if texts.len() < 2 {
        return DEFAULT_SCORE;
    }

    let warm = count_matching(&texts, &WARM_COLORS);
    let cool = count_matching(&texts, &COOL_COLORS);

    if warm > 0 && warm == cool {
        50
    } else if warm >= 2 || cool >= 2 {
        85
    } else {
        65
    }
}

/// Like ratio over the swipe records. Liking nearly everything or nearly
/// nothing is as uninformative as no swipes at all.
fn visual_consistency(answers: &QuizAnswers) -> u8 {
    let Some(Value::Array(swipes)) = answers.first_truthy(&SWIPE_QUESTIONS) else {
        return DEFAULT_SCORE;
    };
    if swipes.is_empty() {
        return DEFAULT_SCORE;
    }

    let likes = swipes.iter().filter(|s| is_like(s)).count();
    let ratio = likes as f64 / swipes.len() as f64;

    if !(0.2..=0.5).contains(&ratio) {
        45
    } else if (0.3..=0.4).contains(&ratio) {
        80
    } else {
        65
    }
}

fn is_like(swipe: &Value) -> bool {
    swipe.get("liked").is_some_and(is_truthy)
        || swipe.get("action").and_then(Value::as_str) == Some("like")
}

/// Rushed completion scores 40, a plausible duration 85 and a very long
/// one (tab left open) 60. `None` without both timestamps.
fn quiz_timing(answers: &QuizAnswers) -> Option<u8> {
    let start = coerce_number(answers.truthy(QUIZ_START)?);
    let end = coerce_number(answers.truthy(QUIZ_END)?);
    let seconds = (end - start) / 1000.0;

    // NaN fails both comparisons and lands on 60
    let score = if seconds < MIN_EXPECTED_SECS {
        40
    } else if seconds <= MAX_EXPECTED_SECS {
        85
    } else {
        60
    };
    Some(score)
}

fn count_matching(texts: &[String], keywords: &[&str]) -> usize {
    texts
        .iter()
        .filter(|t| keywords.iter().any(|k| t.contains(k)))
        .count()
}

fn explanation(overall: u8, style: u8, color: u8) -> String {
    if overall >= 80 {
        return EXPLAIN_CLEAR.to_string();
    }
    if overall >= 60 {
        return EXPLAIN_FLEXIBLE.to_string();
    }

    let mut parts = vec![EXPLAIN_VARIED_OPENING.to_string()];

    let clause = match (style < LOW_SCORE_THRESHOLD, color < LOW_SCORE_THRESHOLD) {
        (true, true) => Some(format!("{} en {}.", EXPLAIN_STYLE_CLAUSE, EXPLAIN_COLOR_CLAUSE)),
        (true, false) => Some(format!("{}.", EXPLAIN_STYLE_CLAUSE)),
        (false, true) => Some(format!("{}.", capitalize(EXPLAIN_COLOR_CLAUSE))),
        (false, false) => None,
    };
    parts.extend(clause);

    parts.push(EXPLAIN_VARIED_CLOSING.to_string());
    parts.join(" ")
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// =============================================================================
// Tests
// =============================================================================

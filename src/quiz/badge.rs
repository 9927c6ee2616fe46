//! Presentation mappings for a confidence analysis

use serde::Serialize;

use super::confidence::ConfidenceAnalysis;

/// Overall score below which the ambiguity warning is shown
pub const AMBIGUITY_WARNING_THRESHOLD: u8 = 55;

/// Overall score from which no banner is shown
pub const BANNER_HIDDEN_FROM: u8 = 75;

/// Badge color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeColor {
    Green,
    Blue,
    Orange,
}

impl BadgeColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeColor::Green => "green",
            BadgeColor::Blue => "blue",
            BadgeColor::Orange => "orange",
        }
    }
}

impl std::fmt::Display for BadgeColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence badge shown next to the style profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfidenceBadge {
    pub label: &'static str,
    pub color: BadgeColor,
    pub icon: &'static str,
}

pub fn get_confidence_badge(confidence: u8) -> ConfidenceBadge {
    if confidence >= 80 {
        ConfidenceBadge {
            label: "Zeer specifiek",
            color: BadgeColor::Green,
            icon: "✓",
        }
    } else if confidence >= 60 {
        ConfidenceBadge {
            label: "Goed beeld",
            color: BadgeColor::Blue,
            icon: "○",
        }
    } else {
        ConfidenceBadge {
            label: "Veelzijdig profiel",
            color: BadgeColor::Orange,
            icon: "◐",
        }
    }
}

/// True for ambiguous profiles scoring below 55.
pub fn should_show_ambiguity_warning(analysis: &ConfidenceAnalysis) -> bool {
    analysis.is_ambiguous && analysis.overall_confidence < AMBIGUITY_WARNING_THRESHOLD
}

/// Results page banner style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerVariant {
    Informational,
    Eclectic,
    Flexible,
}

/// Results page banner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfidenceBanner {
    pub variant: BannerVariant,
    pub title: &'static str,
    pub explanation: String,
    pub recommendations: Vec<String>,
}

/// Banner for the results page; `None` for confident profiles.
pub fn confidence_banner(analysis: &ConfidenceAnalysis) -> Option<ConfidenceBanner> {
    let overall = analysis.overall_confidence;
    if overall >= BANNER_HIDDEN_FROM {
        return None;
    }

    let (variant, title) = if overall >= 60 {
        (BannerVariant::Informational, "Veelzijdig Stijlprofiel")
    } else if analysis.is_ambiguous {
        (BannerVariant::Eclectic, "Eclectische Stijl Gedetecteerd")
    } else {
        (BannerVariant::Flexible, "Flexibel Stijlprofiel")
    };

    Some(ConfidenceBanner {
        variant,
        title,
        explanation: analysis.explanation.clone(),
        recommendations: analysis.recommendations.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(overall: u8, is_ambiguous: bool) -> ConfidenceAnalysis {
        ConfidenceAnalysis {
            overall_confidence: overall,
            color_confidence: overall,
            style_confidence: overall,
            visual_confidence: overall,
            timing_score: None,
            is_ambiguous,
            recommendations: Vec::new(),
            explanation: String::new(),
        }
    }

    #[test]
    fn test_badge_boundaries() {
        assert_eq!(get_confidence_badge(100).label, "Zeer specifiek");
        assert_eq!(get_confidence_badge(80).color, BadgeColor::Green);
        assert_eq!(get_confidence_badge(79).label, "Goed beeld");
        assert_eq!(get_confidence_badge(60).icon, "○");
        assert_eq!(get_confidence_badge(59).color, BadgeColor::Orange);
        assert_eq!(get_confidence_badge(0).icon, "◐");
    }

    #[test]
    fn test_ambiguity_warning() {
        assert!(should_show_ambiguity_warning(&analysis(54, true)));
        assert!(!should_show_ambiguity_warning(&analysis(55, true)));
        assert!(!should_show_ambiguity_warning(&analysis(40, false)));
    }

    #[test]
    fn test_banner_variants() {
        assert!(confidence_banner(&analysis(75, false)).is_none());

        let banner = confidence_banner(&analysis(74, false)).unwrap();
        assert_eq!(banner.variant, BannerVariant::Informational);
        assert_eq!(banner.title, "Veelzijdig Stijlprofiel");

        let banner = confidence_banner(&analysis(59, true)).unwrap();
        assert_eq!(banner.variant, BannerVariant::Eclectic);

        let banner = confidence_banner(&analysis(59, false)).unwrap();
        assert_eq!(banner.variant, BannerVariant::Flexible);
        assert_eq!(banner.title, "Flexibel Stijlprofiel");
    }

    #[test]
    fn test_badge_serializes_color_name() {
        let json = serde_json::to_value(get_confidence_badge(90)).unwrap();
        assert_eq!(json["color"], "green");
        assert_eq!(json["label"], "Zeer specifiek");
    }
}

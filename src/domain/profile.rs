//! Style profile model
//!
//! A style profile is the persisted outcome of a completed quiz. The device
//! keeps a local snapshot; the remote `style_profiles` table is the shared
//! copy that wins when both exist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::quiz::answers::{is_truthy, QuizAnswers};

/// Local view of how the device copy relates to the remote copy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Local and remote copies agree as of the last sync.
    Synced,
    /// Local changes not yet pushed.
    Pending,
    /// The last push failed.
    Error,
    /// No sync has been recorded.
    #[default]
    Unknown,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Synced => "synced",
            SyncStatus::Pending => "pending",
            SyncStatus::Error => "error",
            SyncStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SyncStatus {
    type Err = std::convert::Infallible;

    /// Unrecognised values read as `Unknown`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "synced" => SyncStatus::Synced,
            "pending" => SyncStatus::Pending,
            "error" => SyncStatus::Error,
            _ => SyncStatus::Unknown,
        })
    }
}

/// Sync bookkeeping held next to the local snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub status: SyncStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
}

impl SyncState {
    pub fn synced_at(at: DateTime<Utc>) -> Self {
        Self {
            status: SyncStatus::Synced,
            last_sync: Some(at),
        }
    }
}

/// Style profile row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleProfile {
    /// Remote row id, absent until stored remotely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub archetype: Option<Value>,
    #[serde(default)]
    pub color_profile: Option<Value>,
    #[serde(default)]
    pub color_analysis: Option<Value>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub quiz_answers: Option<QuizAnswers>,
    #[serde(default)]
    pub sizes: Option<Value>,
    #[serde(default)]
    pub budget_range: Option<Value>,
    #[serde(default)]
    pub preferred_occasions: Vec<String>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StyleProfile {
    /// Overlay individually stored answers onto `quiz_answers`.
    pub fn merge_answers(&mut self, rows: Vec<QuizAnswerRow>) {
        if rows.is_empty() {
            return;
        }
        let answers = self.quiz_answers.get_or_insert_with(QuizAnswers::new);
        for row in rows {
            answers.insert(row.question_id, row.answer);
        }
    }
}

/// Individually stored answer (`quiz_answers` table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAnswerRow {
    pub question_id: String,
    pub answer: Value,
}

/// Device-local snapshot of a completed quiz
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalProfile {
    #[serde(default)]
    pub quiz_answers: Option<QuizAnswers>,
    #[serde(default)]
    pub archetype: Option<Value>,
    #[serde(default)]
    pub color_profile: Option<Value>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl LocalProfile {
    /// Overwrite the fields `profile` carries; absent fields keep their value.
    pub fn absorb(&mut self, profile: &StyleProfile) {
        if profile.quiz_answers.is_some() {
            self.quiz_answers = profile.quiz_answers.clone();
        }
        if profile.archetype.as_ref().is_some_and(is_truthy) {
            self.archetype = profile.archetype.clone();
        }
        if profile.color_profile.as_ref().is_some_and(is_truthy) {
            self.color_profile = profile.color_profile.clone();
        }
        if profile.completed_at.is_some() {
            self.completed_at = profile.completed_at;
        }
    }

    /// Expand the snapshot into a profile. `None` without quiz answers.
    ///
    /// Gender, sizes, photo, color analysis, budget and occasions are read
    /// back out of the answers themselves.
    pub fn to_style_profile(&self) -> Option<StyleProfile> {
        let answers = self.quiz_answers.as_ref()?;

        let text = |question: &str| answers.get(question).and_then(Value::as_str).map(String::from);

        let budget_range = answers
            .truthy("budgetRange")
            .map(|max| json!({ "min": 0, "max": max }));

        let preferred_occasions = match answers.get("occasions") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect(),
            _ => Vec::new(),
        };

        Some(StyleProfile {
            gender: text("gender"),
            archetype: self.archetype.clone(),
            color_profile: self.color_profile.clone(),
            color_analysis: answers.get("colorAnalysis").cloned(),
            photo_url: text("photoUrl"),
            sizes: answers.get("sizes").cloned(),
            budget_range,
            preferred_occasions,
            completed_at: self.completed_at,
            quiz_answers: Some(answers.clone()),
            ..StyleProfile::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers() -> QuizAnswers {
        QuizAnswers::new()
            .with("gender", "female")
            .with("budgetRange", 150)
            .with("occasions", json!(["work", "party"]))
            .with("photoUrl", "https://img.example/p.jpg")
            .with("sizes", json!({ "tops": "M" }))
    }

    #[test]
    fn test_status_parse_falls_back_to_unknown() {
        assert_eq!("synced".parse::<SyncStatus>().unwrap(), SyncStatus::Synced);
        assert_eq!("error".parse::<SyncStatus>().unwrap(), SyncStatus::Error);
        assert_eq!("garbage".parse::<SyncStatus>().unwrap(), SyncStatus::Unknown);
        assert_eq!(SyncStatus::Pending.to_string(), "pending");
    }

    #[test]
    fn test_local_profile_derives_fields_from_answers() {
        let local = LocalProfile {
            quiz_answers: Some(answers()),
            archetype: Some(json!("minimalist")),
            ..LocalProfile::default()
        };

        let profile = local.to_style_profile().unwrap();
        assert_eq!(profile.gender.as_deref(), Some("female"));
        assert_eq!(profile.budget_range, Some(json!({ "min": 0, "max": 150 })));
        assert_eq!(profile.preferred_occasions, vec!["work", "party"]);
        assert_eq!(profile.photo_url.as_deref(), Some("https://img.example/p.jpg"));
        assert_eq!(profile.archetype, Some(json!("minimalist")));
        assert!(profile.user_id.is_none());
    }

    #[test]
    fn test_local_profile_without_answers_is_none() {
        let local = LocalProfile {
            archetype: Some(json!("classic")),
            ..LocalProfile::default()
        };
        assert!(local.to_style_profile().is_none());
    }

    #[test]
    fn test_absorb_keeps_fields_the_profile_lacks() {
        let mut local = LocalProfile {
            quiz_answers: Some(answers()),
            archetype: Some(json!("classic")),
            ..LocalProfile::default()
        };

        local.absorb(&StyleProfile {
            archetype: Some(json!("bold")),
            ..StyleProfile::default()
        });

        assert_eq!(local.archetype, Some(json!("bold")));
        assert_eq!(local.quiz_answers, Some(answers()));
    }

    #[test]
    fn test_merge_answers_overrides_profile_answers() {
        let mut profile = StyleProfile {
            quiz_answers: Some(QuizAnswers::new().with("gender", "male")),
            ..StyleProfile::default()
        };

        profile.merge_answers(vec![QuizAnswerRow {
            question_id: "gender".into(),
            answer: json!("female"),
        }]);

        let answers = profile.quiz_answers.unwrap();
        assert_eq!(answers.get("gender"), Some(&json!("female")));
    }
}

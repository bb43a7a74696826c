//! Weekly food-service satisfaction feed.
//!
//! Residents score each mess on hygiene, taste, and quality. Ratings are
//! bucketed by the Monday that starts their week on the campus local clock,
//! and summarized per mess for the current week or for all time.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::LifecycleError;
use crate::rating::RATING_RANGE;

/// Minimum length for a review or suggestion to be shown as a voice.
const MIN_VOICE_LEN: usize = 3;

/// Scores submitted for one mess
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessRatingDraft {
    pub mess_name: String,
    pub hygiene: u8,
    pub taste: u8,
    pub quality: u8,
    pub review: Option<String>,
    pub suggestions: Option<String>,
    /// Optional photo as a data URL
    #[serde(default)]
    pub image_data: Option<String>,
}

impl MessRatingDraft {
    pub fn validate(&self) -> Result<(), LifecycleError> {
        if self.mess_name.trim().is_empty() {
            return Err(LifecycleError::Validation("mess_name is required".to_string()));
        }
        for (field, score) in [
            ("hygiene", self.hygiene),
            ("taste", self.taste),
            ("quality", self.quality),
        ] {
            if !RATING_RANGE.contains(&score) {
                return Err(LifecycleError::Validation(format!(
                    "{} must be between 1 and 5, got {}",
                    field, score
                )));
            }
        }
        Ok(())
    }
}

/// A stored mess rating
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessRating {
    pub id: String,
    /// Submitting user; None for imported ratings
    pub user_id: Option<String>,
    pub mess_name: String,
    /// Monday of the local week the rating belongs to
    pub week_start: NaiveDate,
    pub hygiene: u8,
    pub taste: u8,
    pub quality: u8,
    pub review: Option<String>,
    pub suggestions: Option<String>,
    #[serde(default)]
    pub image_data: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MessRating {
    pub fn new(draft: MessRatingDraft, user_id: Option<String>, created_at: DateTime<Utc>, offset: &FixedOffset) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            mess_name: draft.mess_name.trim().to_string(),
            week_start: week_start(created_at, offset),
            hygiene: draft.hygiene,
            taste: draft.taste,
            quality: draft.quality,
            review: draft.review,
            suggestions: draft.suggestions,
            image_data: draft.image_data,
            created_at,
        }
    }

    fn overall(&self) -> f64 {
        f64::from(u16::from(self.hygiene) + u16::from(self.taste) + u16::from(self.quality)) / 3.0
    }

    /// Written feedback of at least [`MIN_VOICE_LEN`] characters, or a photo.
    fn has_voice(&self) -> bool {
        let long_enough =
            |s: &Option<String>| s.as_deref().is_some_and(|s| s.chars().count() >= MIN_VOICE_LEN);
        long_enough(&self.review) || long_enough(&self.suggestions) || self.image_data.is_some()
    }
}

/// Monday of the week containing `at`, on the local clock.
pub fn week_start(at: DateTime<Utc>, offset: &FixedOffset) -> NaiveDate {
    let local = at.with_timezone(offset).date_naive();
    local - Duration::days(i64::from(local.weekday().num_days_from_monday()))
}

/// Time window for analytics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsScope {
    #[default]
    Week,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreAverages {
    pub hygiene: f64,
    pub taste: f64,
    pub quality: f64,
    pub overall: f64,
}

/// A rating with written feedback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessVoice {
    pub rating: f64,
    pub review: Option<String>,
    pub suggestion: Option<String>,
    pub image: Option<String>,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessAnalytics {
    pub avg: ScoreAverages,
    pub sentiment: String,
    pub action_item: String,
    pub total: usize,
    /// Newest first
    pub reviews: Vec<MessVoice>,
}

impl MessAnalytics {
    fn empty() -> Self {
        Self {
            avg: ScoreAverages::default(),
            sentiment: "No data yet".to_string(),
            action_item: "Waiting for reviews...".to_string(),
            total: 0,
            reviews: Vec::new(),
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn assess(overall: f64) -> (&'static str, &'static str) {
    if overall >= 4.0 {
        ("Positive", "Reward vendor for consistency.")
    } else if overall < 2.0 {
        ("Severe", "Consider terminating contract.")
    } else if overall < 3.0 {
        ("Critical", "Immediate hygiene inspection required.")
    } else {
        ("Neutral", "Maintain standards.")
    }
}

/// Summarize ratings for one mess (or all messes) over a scope.
pub fn analytics(
    ratings: &[MessRating],
    mess: Option<&str>,
    scope: AnalyticsScope,
    now: DateTime<Utc>,
    offset: &FixedOffset,
) -> MessAnalytics {
    let current_week = week_start(now, offset);
    let wanted = mess.map(|m| m.trim().to_lowercase());

    let mut selected: Vec<&MessRating> = ratings
        .iter()
        .filter(|r| scope == AnalyticsScope::All || r.week_start == current_week)
        .filter(|r| wanted.as_ref().map_or(true, |m| r.mess_name.to_lowercase() == *m))
        .collect();

    if selected.is_empty() {
        return MessAnalytics::empty();
    }

    let total = selected.len();
    let mean = |f: fn(&MessRating) -> u8| {
        selected.iter().map(|r| f64::from(f(r))).sum::<f64>() / total as f64
    };
    let hygiene = mean(|r| r.hygiene);
    let taste = mean(|r| r.taste);
    let quality = mean(|r| r.quality);
    let overall = (hygiene + taste + quality) / 3.0;
    let (sentiment, action_item) = assess(overall);

    selected.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let reviews = selected
        .into_iter()
        .filter(|r| r.has_voice())
        .map(|r| MessVoice {
            rating: round1(r.overall()),
            review: r.review.clone(),
            suggestion: r.suggestions.clone(),
            image: r.image_data.clone(),
            date: r.created_at.with_timezone(offset).date_naive(),
        })
        .collect();

    MessAnalytics {
        avg: ScoreAverages {
            hygiene: round1(hygiene),
            taste: round1(taste),
            quality: round1(quality),
            overall: round1(overall),
        },
        sentiment: sentiment.to_string(),
        action_item: action_item.to_string(),
        total,
        reviews,
    }
}

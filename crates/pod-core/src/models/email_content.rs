//! Structured AI-derived fields used when rendering a digest email.
//!
//! This is the closed schema that the `MetadataExtractor` must validate
//! its AI provider's response against (see component 4.E). Keeping it as
//! a typed struct instead of a loose JSON blob means a malformed AI
//! response is rejected at the extractor boundary, not discovered later
//! while rendering a digest.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PodcastType {
    News,
    Interview,
    General,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorySummary {
    pub headline: String,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailContent {
    pub podcast_type: PodcastType,
    pub teaser_summary: String,
    pub key_takeaways: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_moment: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub story_summaries: Vec<StorySummary>,
}

impl EmailContent {
    /// Validates the shape constraints from component 4.E: a teaser in
    /// `[20, 300]` chars and at least one takeaway. `story_summaries`
    /// beyond seven entries is truncated rather than rejected, since an
    /// over-eager AI response is a formatting nuisance, not bad data.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let teaser_len = self.teaser_summary.chars().count();
        (20..=300).contains(&teaser_len) && !self.key_takeaways.is_empty()
    }
}

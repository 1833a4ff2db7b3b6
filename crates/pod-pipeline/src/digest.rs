//! DigestWorker (§4.J): assembles per-user daily email digests and hands
//! them to the mail collaborator at each user's local delivery hour.
//! The mail transport itself is out of scope (§1); `MailSender` is the
//! seam a real transport plugs into.

use std::collections::BTreeMap;
use std::future::Future;

use chrono::{Datelike, TimeZone, Utc};
use chrono_tz::Tz;
use pod_core::{Episode, User};
use pod_db::Database;
use uuid::Uuid;

use crate::error::{PipelineError, WorkerResult};

const DEFAULT_TIMEZONE: &str = "UTC";
const DEFAULT_DIGEST_HOUR: i32 = 8;
const MAX_EPISODES_PER_DIGEST: i64 = 20;
const LOOKBACK_HOURS: i64 = 24;
const MAX_TAKEAWAYS: usize = 5;
const MAX_STORY_ITEMS: usize = 7;
const FALLBACK_SUMMARY_LEN: usize = 300;

/// Abstracts the outbound mail transport. A digest is never sent if no
/// implementation is configured (§7 user-visible behavior).
pub trait MailSender: Send + Sync {
    fn send(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> impl Future<Output = Result<(), PipelineError>> + Send;
}

pub struct DigestWorker<M> {
    db: Database,
    mailer: Option<M>,
    web_base_url: Option<String>,
}

impl<M: MailSender> DigestWorker<M> {
    #[must_use]
    pub const fn new(db: Database, mailer: Option<M>, web_base_url: Option<String>) -> Self {
        Self { db, mailer, web_base_url }
    }

    /// Runs one digest sweep: every user due a check (opt-in, cooldown)
    /// is filtered further by timezone-local hour, rendered, and sent.
    pub async fn run(&self) -> WorkerResult {
        let now = Utc::now();
        let users = match self.db.users().get_users_for_email_digest().await {
            Ok(u) => u,
            Err(e) => {
                return WorkerResult {
                    failed: 1,
                    errors: vec![e.to_string()],
                    ..WorkerResult::default()
                };
            }
        };

        let mut result = WorkerResult::default();
        for user in users {
            if !is_local_hour_match(&user, now) {
                result.skipped += 1;
                continue;
            }
            match self.send_digest_for_user(&user, now).await {
                Ok(()) => result.processed += 1,
                Err(e) => {
                    result.failed += 1;
                    result.errors.push(format!("{}: {e}", user.id));
                }
            }
        }
        result
    }

    async fn send_digest_for_user(&self, user: &User, now: chrono::DateTime<Utc>) -> Result<(), PipelineError> {
        let since = now - chrono::Duration::hours(LOOKBACK_HOURS);
        let episodes = self
            .db
            .episodes()
            .get_new_episodes_for_user_since(user.id, since, MAX_EPISODES_PER_DIGEST)
            .await?;

        if episodes.is_empty() {
            self.db.users().mark_email_digest_sent(user.id, now).await?;
            return Ok(());
        }

        if let Some(mailer) = &self.mailer {
            let podcasts = self.podcast_titles(&episodes).await;
            let rendering = render_digest(&episodes, &podcasts, self.web_base_url.as_deref());
            mailer.send(&user.email, &rendering.subject, &rendering.html, &rendering.text).await?;
        }

        self.db.users().mark_email_digest_sent(user.id, now).await?;
        Ok(())
    }

    async fn podcast_titles(&self, episodes: &[Episode]) -> BTreeMap<Uuid, String> {
        let mut titles = BTreeMap::new();
        for episode in episodes {
            if let std::collections::btree_map::Entry::Vacant(slot) = titles.entry(episode.podcast_id) {
                if let Ok(Some(podcast)) = self.db.podcasts().get_by_id(episode.podcast_id).await {
                    slot.insert(podcast.title);
                }
            }
        }
        titles
    }
}

/// Computes `user.timezone`'s current local hour and compares it against
/// `user.email_digest_hour`. Invalid IANA strings fall back to UTC with a
/// logged warning (§4.J).
fn is_local_hour_match(user: &User, now: chrono::DateTime<Utc>) -> bool {
    let tz: Tz = user.timezone.parse().unwrap_or_else(|_| {
        tracing::warn!(user_id = %user.id, timezone = %user.timezone, "invalid timezone, defaulting to UTC");
        DEFAULT_TIMEZONE.parse().expect("UTC always parses")
    });
    let local = now.with_timezone(&tz);
    local.hour() as i32 == digest_hour(user)
}

fn digest_hour(user: &User) -> i32 {
    if (0..=23).contains(&user.email_digest_hour) {
        user.email_digest_hour
    } else {
        DEFAULT_DIGEST_HOUR
    }
}

struct DigestRendering {
    subject: String,
    html: String,
    text: String,
}

fn render_digest(
    episodes: &[Episode],
    podcast_titles: &BTreeMap<Uuid, String>,
    web_base_url: Option<&str>,
) -> DigestRendering {
    let count = episodes.len();
    let noun = if count == 1 { "episode" } else { "episodes" };
    let subject = format!("Your Daily Podcast Digest - {count} new {noun}");

    let mut by_podcast: BTreeMap<Uuid, Vec<&Episode>> = BTreeMap::new();
    for episode in episodes {
        by_podcast.entry(episode.podcast_id).or_default().push(episode);
    }

    let mut html = String::from("<html><body>");
    let mut text = String::new();

    for (podcast_id, group) in &by_podcast {
        let title = podcast_titles.get(podcast_id).map_or("Podcast", String::as_str);
        html.push_str(&format!("<h2>{}</h2>", escape_html(title)));
        text.push_str(&format!("{title}\n{}\n", "-".repeat(title.len())));

        for episode in group {
            render_episode(episode, web_base_url, &mut html, &mut text);
        }
    }
    html.push_str("</body></html>");

    DigestRendering { subject, html, text }
}

fn render_episode(episode: &Episode, web_base_url: Option<&str>, html: &mut String, text: &mut String) {
    let link = episode_link(episode, web_base_url);
    let teaser = teaser_for(episode);

    html.push_str(&format!(
        "<h3><a href=\"{}\">{}</a></h3><p>{}</p>",
        escape_html(&link),
        escape_html(&episode.title),
        escape_html(&teaser)
    ));
    text.push_str(&format!("* {} ({link})\n  {teaser}\n", episode.title));

    if let Some(content) = &episode.ai_email_content {
        if let Ok(parsed) = serde_json::from_value::<pod_core::EmailContent>(content.clone()) {
            render_takeaways(&parsed, html, text);
            render_highlight(&parsed, html, text);
            render_story_summaries(&parsed, html, text);
        }
    }
}

fn render_takeaways(parsed: &pod_core::EmailContent, html: &mut String, text: &mut String) {
    if parsed.key_takeaways.is_empty() {
        return;
    }
    html.push_str("<ul>");
    for takeaway in parsed.key_takeaways.iter().take(MAX_TAKEAWAYS) {
        html.push_str(&format!("<li>{}</li>", escape_html(takeaway)));
        text.push_str(&format!("  - {takeaway}\n"));
    }
    html.push_str("</ul>");
}

fn render_highlight(parsed: &pod_core::EmailContent, html: &mut String, text: &mut String) {
    if let Some(highlight) = &parsed.highlight_moment {
        html.push_str(&format!("<p><em>{}</em></p>", escape_html(highlight)));
        text.push_str(&format!("  Highlight: {highlight}\n"));
    }
}

fn render_story_summaries(parsed: &pod_core::EmailContent, html: &mut String, text: &mut String) {
    if parsed.podcast_type != pod_core::PodcastType::News {
        return;
    }
    for story in parsed.story_summaries.iter().take(MAX_STORY_ITEMS) {
        html.push_str(&format!(
            "<p><strong>{}</strong>: {}</p>",
            escape_html(&story.headline),
            escape_html(&story.summary)
        ));
        text.push_str(&format!("  {}: {}\n", story.headline, story.summary));
    }
}

/// Episode link: a configured web base URL, falling back to the
/// enclosure URL sanitized to `http`/`https` (§6).
fn episode_link(episode: &Episode, web_base_url: Option<&str>) -> String {
    match web_base_url {
        Some(base) => format!("{}/episodes/{}", base.trim_end_matches('/'), episode.id),
        None => sanitize_to_http_scheme(&episode.enclosure_url),
    }
}

fn sanitize_to_http_scheme(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        String::new()
    }
}

/// Teaser from `ai_email_content`, or `ai_summary` truncated to 300
/// characters when the structured content is missing (§4.J fallback).
fn teaser_for(episode: &Episode) -> String {
    if let Some(content) = &episode.ai_email_content {
        if let Ok(parsed) = serde_json::from_value::<pod_core::EmailContent>(content.clone()) {
            if !parsed.teaser_summary.is_empty() {
                return parsed.teaser_summary;
            }
        }
    }
    episode
        .ai_summary
        .as_deref()
        .map(|s| pod_util::truncate(s, FALLBACK_SUMMARY_LEN))
        .unwrap_or_default()
}

/// Minimal HTML escaping for user-controlled text (§4.J: "All
/// user-controlled text is HTML-escaped").
fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    fn user_with(timezone: &str, hour: i32) -> User {
        let mut u = User::new("ext".to_string(), "a@example.com".to_string());
        u.timezone = timezone.to_string();
        u.email_digest_hour = hour;
        u
    }

    #[test]
    fn s4_timezone_filter() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 5, 0).unwrap();
        let user_a = user_with("America/New_York", 8);
        let user_b = user_with("UTC", 8);
        assert!(is_local_hour_match(&user_a, now));
        assert!(!is_local_hour_match(&user_b, now));
    }

    #[test]
    fn invalid_timezone_falls_back_to_utc() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).unwrap();
        let user = user_with("Not/A_Zone", 8);
        assert!(is_local_hour_match(&user, now));
    }

    #[test]
    fn out_of_range_digest_hour_falls_back_to_default() {
        let user = user_with("UTC", 99);
        assert_eq!(digest_hour(&user), DEFAULT_DIGEST_HOUR);
    }

    #[test]
    fn escapes_html_special_characters() {
        assert_eq!(escape_html("<b>Tom & Jerry's \"show\"</b>"), "&lt;b&gt;Tom &amp; Jerry&#39;s &quot;show&quot;&lt;/b&gt;");
    }

    #[test]
    fn falls_back_to_truncated_summary_without_email_content() {
        let mut episode = Episode::new(
            Uuid::now_v7(),
            "guid".to_string(),
            pod_core::SourceType::Rss,
            "Ep".to_string(),
            Utc::now(),
            "https://cdn.example/ep.mp3".to_string(),
        );
        episode.ai_summary = Some("x".repeat(400));
        let teaser = teaser_for(&episode);
        assert!(teaser.chars().count() <= FALLBACK_SUMMARY_LEN);
    }
}

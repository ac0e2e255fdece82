//! Heuristic quality scoring for scraped research content.
//!
//! The scorer is a pure function over (content, title, url, content type):
//! additive signals with clamping, no I/O, no randomness. Identical inputs
//! always produce identical scores. Thresholds and weights are product
//! tuning values surfaced through [`QualityWeights`] so deployments can
//! adjust them without a code change; the pattern and keyword lists are
//! part of the heuristic itself and stay in code.

mod classify;

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Broad classification of a scraped page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    InterviewReview,
    CompanyInfo,
    JobPosting,
    News,
    Other,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::InterviewReview => "interview_review",
            ContentType::CompanyInfo => "company_info",
            ContentType::JobPosting => "job_posting",
            ContentType::News => "news",
            ContentType::Other => "other",
        }
    }

    /// Parse a stored value; unknown strings classify as `Other`.
    pub fn parse(s: &str) -> Self {
        match s {
            "interview_review" => ContentType::InterviewReview,
            "company_info" => ContentType::CompanyInfo,
            "job_posting" => ContentType::JobPosting,
            "news" => ContentType::News,
            _ => ContentType::Other,
        }
    }
}

/// Tunable thresholds and weights for the quality heuristic.
///
/// Defaults are the long-standing production tuning. Word-count
/// thresholds bucket the length signal; domain tiers reward sites whose
/// content has historically fed good interview prep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityWeights {
    /// Every score starts here before signals apply.
    #[serde(default = "default_base_score")]
    pub base_score: f64,
    /// Below this many words the content scores `floor_score` outright
    /// and every other signal is skipped.
    #[serde(default = "default_floor_words")]
    pub floor_words: usize,
    #[serde(default = "default_floor_score")]
    pub floor_score: f64,
    /// Below this many words the short-content penalty applies.
    #[serde(default = "default_short_words")]
    pub short_words: usize,
    #[serde(default = "default_short_penalty")]
    pub short_penalty: f64,
    /// Above this many words the long-content bonus applies.
    #[serde(default = "default_long_words")]
    pub long_words: usize,
    #[serde(default = "default_long_bonus")]
    pub long_bonus: f64,
    #[serde(default = "default_very_long_words")]
    pub very_long_words: usize,
    #[serde(default = "default_very_long_bonus")]
    pub very_long_bonus: f64,
    /// High-value interview-review and coding-practice sites.
    #[serde(default = "default_primary_domains")]
    pub primary_domains: Vec<String>,
    #[serde(default = "default_primary_domain_bonus")]
    pub primary_domain_bonus: f64,
    /// Secondary tier of forums and discussion sites.
    #[serde(default = "default_secondary_domains")]
    pub secondary_domains: Vec<String>,
    #[serde(default = "default_secondary_domain_bonus")]
    pub secondary_domain_bonus: f64,
    #[serde(default = "default_interview_review_bonus")]
    pub interview_review_bonus: f64,
    #[serde(default = "default_company_info_bonus")]
    pub company_info_bonus: f64,
    #[serde(default = "default_job_posting_bonus")]
    pub job_posting_bonus: f64,
    /// Applied once per matching title keyword group.
    #[serde(default = "default_title_keyword_bonus")]
    pub title_keyword_bonus: f64,
    /// Pattern occurrences needed for the structured-content bonus.
    #[serde(default = "default_pattern_threshold")]
    pub pattern_threshold: usize,
    #[serde(default = "default_pattern_bonus")]
    pub pattern_bonus: f64,
    #[serde(default = "default_strong_pattern_threshold")]
    pub strong_pattern_threshold: usize,
    #[serde(default = "default_strong_pattern_bonus")]
    pub strong_pattern_bonus: f64,
    /// Applied once per co-occurring phrase pair.
    #[serde(default = "default_cooccurrence_bonus")]
    pub cooccurrence_bonus: f64,
}

fn default_base_score() -> f64 {
    0.5
}

fn default_floor_words() -> usize {
    20
}

fn default_floor_score() -> f64 {
    0.1
}

fn default_short_words() -> usize {
    50
}

fn default_short_penalty() -> f64 {
    0.4
}

fn default_long_words() -> usize {
    800
}

fn default_long_bonus() -> f64 {
    0.25
}

fn default_very_long_words() -> usize {
    1500
}

fn default_very_long_bonus() -> f64 {
    0.15
}

fn default_primary_domains() -> Vec<String> {
    ["glassdoor.com", "indeed.com", "levels.fyi", "teamblind.com", "leetcode.com"]
        .map(String::from)
        .to_vec()
}

fn default_primary_domain_bonus() -> f64 {
    0.2
}

fn default_secondary_domains() -> Vec<String> {
    ["reddit.com", "quora.com", "news.ycombinator.com", "medium.com", "linkedin.com"]
        .map(String::from)
        .to_vec()
}

fn default_secondary_domain_bonus() -> f64 {
    0.15
}

fn default_interview_review_bonus() -> f64 {
    0.3
}

fn default_company_info_bonus() -> f64 {
    0.2
}

fn default_job_posting_bonus() -> f64 {
    0.1
}

fn default_title_keyword_bonus() -> f64 {
    0.1
}

fn default_pattern_threshold() -> usize {
    3
}

fn default_pattern_bonus() -> f64 {
    0.3
}

fn default_strong_pattern_threshold() -> usize {
    5
}

fn default_strong_pattern_bonus() -> f64 {
    0.2
}

fn default_cooccurrence_bonus() -> f64 {
    0.1
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            base_score: default_base_score(),
            floor_words: default_floor_words(),
            floor_score: default_floor_score(),
            short_words: default_short_words(),
            short_penalty: default_short_penalty(),
            long_words: default_long_words(),
            long_bonus: default_long_bonus(),
            very_long_words: default_very_long_words(),
            very_long_bonus: default_very_long_bonus(),
            primary_domains: default_primary_domains(),
            primary_domain_bonus: default_primary_domain_bonus(),
            secondary_domains: default_secondary_domains(),
            secondary_domain_bonus: default_secondary_domain_bonus(),
            interview_review_bonus: default_interview_review_bonus(),
            company_info_bonus: default_company_info_bonus(),
            job_posting_bonus: default_job_posting_bonus(),
            title_keyword_bonus: default_title_keyword_bonus(),
            pattern_threshold: default_pattern_threshold(),
            pattern_bonus: default_pattern_bonus(),
            strong_pattern_threshold: default_strong_pattern_threshold(),
            strong_pattern_bonus: default_strong_pattern_bonus(),
            cooccurrence_bonus: default_cooccurrence_bonus(),
        }
    }
}

/// Interview-specific phrasings counted by the structured-pattern signal.
/// Matched against lowercased content.
static INTERVIEW_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\d+\s+(?:rounds?|stages?)",
        r"(?:technical|behavioral|behavioural)\s+(?:questions?|interviews?|rounds?)",
        r"hiring\s+manager",
        r"offer\s+(?:extended|received|rejected|accepted)",
        r"phone\s+screen",
        r"on[- ]?site\s+(?:interview|loop)",
        r"coding\s+(?:challenge|assessment|test)",
        r"recruiter\s+(?:reached|contacted|called|emailed)",
        r"final\s+round",
        r"take[- ]home\s+(?:assignment|project|test)",
        r"system\s+design\s+(?:round|interview|question)",
        r"whiteboard",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Scores and classifies scraped content.
#[derive(Debug, Clone, Default)]
pub struct QualityScorer {
    weights: QualityWeights,
}

impl QualityScorer {
    /// Domain tier entries are lowercased up front so mixed-case
    /// configuration still matches the lowercased page host.
    pub fn new(mut weights: QualityWeights) -> Self {
        for domain in weights
            .primary_domains
            .iter_mut()
            .chain(weights.secondary_domains.iter_mut())
        {
            *domain = domain.to_ascii_lowercase();
        }
        Self { weights }
    }

    /// Score content usefulness for interview research on a 0 to 1 scale.
    pub fn score(&self, content: &str, title: &str, url: &str, content_type: ContentType) -> f64 {
        let w = &self.weights;
        let words = content.split_whitespace().count();
        if words < w.floor_words {
            return w.floor_score;
        }

        let mut score = w.base_score;

        if words < w.short_words {
            score -= w.short_penalty;
        } else if words > w.long_words {
            score += w.long_bonus;
            if words > w.very_long_words {
                score += w.very_long_bonus;
            }
        }

        score += self.domain_signal(url);

        score += match content_type {
            ContentType::InterviewReview => w.interview_review_bonus,
            ContentType::CompanyInfo => w.company_info_bonus,
            ContentType::JobPosting => w.job_posting_bonus,
            ContentType::News | ContentType::Other => 0.0,
        };

        let title = title.to_lowercase();
        if title.contains("interview") || title.contains("experience") {
            score += w.title_keyword_bonus;
        }
        if title.contains("question") || title.contains("review") {
            score += w.title_keyword_bonus;
        }

        let text = content.to_lowercase();
        let matches = pattern_matches(&text);
        if matches >= w.pattern_threshold {
            score += w.pattern_bonus;
            if matches >= w.strong_pattern_threshold {
                score += w.strong_pattern_bonus;
            }
        }

        if text.contains("interview process") && text.contains("interviewer asked") {
            score += w.cooccurrence_bonus;
        }
        if text.contains("question") && text.contains("answer") {
            score += w.cooccurrence_bonus;
        }

        score.clamp(0.0, 1.0)
    }

    /// Classify a page before scoring it.
    pub fn classify(&self, url: &str, title: &str, content: &str) -> ContentType {
        classify::classify_content_type(&self.weights, url, title, content)
    }

    fn domain_signal(&self, url: &str) -> f64 {
        let Some(host) = host_of(url) else {
            return 0.0;
        };
        if matches_any(&host, &self.weights.primary_domains) {
            self.weights.primary_domain_bonus
        } else if matches_any(&host, &self.weights.secondary_domains) {
            self.weights.secondary_domain_bonus
        } else {
            0.0
        }
    }
}

fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_ascii_lowercase())
}

fn matches_any(host: &str, domains: &[String]) -> bool {
    domains.iter().any(|d| host == d.as_str() || host.ends_with(&format!(".{d}")))
}

fn pattern_matches(text: &str) -> usize {
    INTERVIEW_PATTERNS.iter().map(|re| re.find_iter(text).count()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn scorer() -> QualityScorer {
        QualityScorer::default()
    }

    fn filler(words: usize) -> String {
        vec!["lorem"; words].join(" ")
    }

    fn assert_score(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < EPS, "expected {expected}, got {actual}");
    }

    #[test]
    fn test_tiny_content_floors_and_skips_signals() {
        let s = scorer();
        let score = s.score(
            &filler(10),
            "Interview questions review",
            "https://glassdoor.com/r/1",
            ContentType::InterviewReview,
        );
        assert_score(score, 0.1);
    }

    #[test]
    fn test_short_content_penalized() {
        let s = scorer();
        let score = s.score(&filler(30), "", "https://example.com", ContentType::CompanyInfo);
        assert_score(score, 0.5 - 0.4 + 0.2);
    }

    #[test]
    fn test_length_signal_monotonic() {
        let s = scorer();
        let mid = s.score(&filler(100), "", "https://example.com", ContentType::Other);
        let long = s.score(&filler(1000), "", "https://example.com", ContentType::Other);
        let very_long = s.score(&filler(2000), "", "https://example.com", ContentType::Other);
        assert_score(mid, 0.5);
        assert_score(long, 0.75);
        assert_score(very_long, 0.9);
        assert!(mid < long && long < very_long);
    }

    #[test]
    fn test_domain_tiers() {
        let s = scorer();
        let body = filler(100);
        assert_score(s.score(&body, "", "https://glassdoor.com/r/1", ContentType::Other), 0.7);
        assert_score(s.score(&body, "", "https://www.glassdoor.com/r/1", ContentType::Other), 0.7);
        assert_score(s.score(&body, "", "https://de.glassdoor.com/r/1", ContentType::Other), 0.7);
        assert_score(s.score(&body, "", "https://reddit.com/r/cscareers", ContentType::Other), 0.65);
        assert_score(s.score(&body, "", "https://glassdoor.evil.com/r/1", ContentType::Other), 0.5);
        assert_score(s.score(&body, "", "not a url", ContentType::Other), 0.5);
    }

    #[test]
    fn test_mixed_case_config_domains_match() {
        let weights = QualityWeights {
            primary_domains: vec!["Glassdoor.com".to_string()],
            ..QualityWeights::default()
        };
        let s = QualityScorer::new(weights);
        let body = filler(100);
        assert_score(s.score(&body, "", "https://glassdoor.com/r/1", ContentType::Other), 0.7);
        assert_score(s.score(&body, "", "https://de.glassdoor.com/r/1", ContentType::Other), 0.7);
    }

    #[test]
    fn test_content_type_signal() {
        let s = scorer();
        let body = filler(100);
        let url = "https://example.com";
        assert_score(s.score(&body, "", url, ContentType::InterviewReview), 0.8);
        assert_score(s.score(&body, "", url, ContentType::CompanyInfo), 0.7);
        assert_score(s.score(&body, "", url, ContentType::JobPosting), 0.6);
        assert_score(s.score(&body, "", url, ContentType::News), 0.5);
        assert_score(s.score(&body, "", url, ContentType::Other), 0.5);
    }

    #[test]
    fn test_title_keyword_groups() {
        let s = scorer();
        let body = filler(100);
        let url = "https://example.com";
        assert_score(s.score(&body, "My interview experience", url, ContentType::Other), 0.6);
        assert_score(s.score(&body, "Top questions asked", url, ContentType::Other), 0.6);
        assert_score(s.score(&body, "Interview questions review", url, ContentType::Other), 0.7);
    }

    #[test]
    fn test_pattern_signal_thresholds() {
        let s = scorer();
        let url = "https://example.com";

        let three = format!("{} 3 rounds phone screen hiring manager", filler(30));
        assert_score(s.score(&three, "", url, ContentType::Other), 0.5 - 0.4 + 0.3);

        let five = format!("{three} final round coding test");
        assert_score(s.score(&five, "", url, ContentType::Other), 0.5 - 0.4 + 0.3 + 0.2);
    }

    #[test]
    fn test_cooccurrence_signal() {
        let s = scorer();
        let url = "https://example.com";

        let one_pair = format!(
            "{} the interview process was long and the interviewer asked about scaling",
            filler(100)
        );
        assert_score(s.score(&one_pair, "", url, ContentType::Other), 0.6);

        let both_pairs = format!("{one_pair} each question had a clear answer");
        assert_score(s.score(&both_pairs, "", url, ContentType::Other), 0.7);
    }

    #[test]
    fn test_score_clamped_to_one() {
        let s = scorer();
        let body = format!(
            "{} 3 rounds phone screen hiring manager final round coding test \
             interview process interviewer asked question answer",
            filler(2000)
        );
        let score = s.score(
            &body,
            "Interview questions review experience",
            "https://glassdoor.com/r/1",
            ContentType::InterviewReview,
        );
        assert_score(score, 1.0);
    }

    #[test]
    fn test_score_deterministic() {
        let s = scorer();
        let body = format!("{} phone screen", filler(600));
        let a = s.score(&body, "Interview", "https://reddit.com/r/x", ContentType::InterviewReview);
        let b = s.score(&body, "Interview", "https://reddit.com/r/x", ContentType::InterviewReview);
        assert_eq!(a, b);
    }

    #[test]
    fn test_custom_weights_respected() {
        let weights = QualityWeights {
            base_score: 0.9,
            floor_words: 0,
            short_words: 0,
            long_words: usize::MAX,
            primary_domain_bonus: 0.0,
            secondary_domain_bonus: 0.0,
            interview_review_bonus: 0.0,
            company_info_bonus: 0.0,
            job_posting_bonus: 0.0,
            title_keyword_bonus: 0.0,
            pattern_bonus: 0.0,
            strong_pattern_bonus: 0.0,
            cooccurrence_bonus: 0.0,
            ..QualityWeights::default()
        };
        let s = QualityScorer::new(weights);
        let score = s.score(
            "phone screen hiring manager interview",
            "Interview review",
            "https://glassdoor.com/r/1",
            ContentType::InterviewReview,
        );
        assert_score(score, 0.9);
    }

    #[test]
    fn test_pattern_counting_sums_occurrences() {
        let text = "phone screen then another phone screen and 2 rounds";
        assert_eq!(pattern_matches(text), 3);
    }

    #[test]
    fn test_host_of_strips_www() {
        assert_eq!(host_of("https://www.Glassdoor.com/r/1").as_deref(), Some("glassdoor.com"));
        assert_eq!(host_of("https://sub.reddit.com/x").as_deref(), Some("sub.reddit.com"));
        assert!(host_of("::not-a-url::").is_none());
    }
}

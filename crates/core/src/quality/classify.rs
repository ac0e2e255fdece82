//! Rule-based content-type classification.
//!
//! Runs before scoring so the content-type signal has something to work
//! with. Rules are ordered: the first hit wins, so a careers page on a
//! review site still classifies as an interview review when the interview
//! keyword is present.

use super::{ContentType, QualityWeights, host_of, matches_any};

const JOB_URL_KEYWORDS: &[&str] = &["/careers", "/jobs", "/job/", "greenhouse.io", "lever.co"];
const JOB_TITLE_KEYWORDS: &[&str] = &["hiring", "job opening", "vacancy", "apply now"];
const NEWS_URL_KEYWORDS: &[&str] = &["news", "blog", "/press", "techcrunch"];
const CULTURE_PHRASES: &[&str] =
    &["company culture", "our mission", "our values", "about us", "what we do"];

pub(super) fn classify_content_type(
    weights: &QualityWeights,
    url: &str,
    title: &str,
    content: &str,
) -> ContentType {
    let url_lower = url.to_lowercase();
    let title_lower = title.to_lowercase();

    // Review-aggregator and discussion-board domains carrying the
    // interview keyword are the strongest signal we have.
    if let Some(host) = host_of(url)
        && (matches_any(&host, &weights.primary_domains)
            || matches_any(&host, &weights.secondary_domains))
        && (url_lower.contains("interview") || title_lower.contains("interview"))
    {
        return ContentType::InterviewReview;
    }

    if JOB_URL_KEYWORDS.iter().any(|k| url_lower.contains(k))
        || JOB_TITLE_KEYWORDS.iter().any(|k| title_lower.contains(k))
    {
        return ContentType::JobPosting;
    }

    if NEWS_URL_KEYWORDS.iter().any(|k| url_lower.contains(k)) {
        return ContentType::News;
    }

    let content_lower = content.to_lowercase();
    if CULTURE_PHRASES.iter().any(|p| content_lower.contains(p)) {
        return ContentType::CompanyInfo;
    }

    if title_lower.contains("interview") || content_lower.contains("interview") {
        return ContentType::InterviewReview;
    }

    ContentType::Other
}

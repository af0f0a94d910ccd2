//! Issue detection and compliance scoring.
//!
//! One check per aspect over the analysis functions, with a fixed
//! severity/priority/weight table carried by [`IssueKind`]. The detector is
//! pure: same content + thresholds in, same issues out.

use crate::analysis;
use crate::config::ThresholdsConfig;
use crate::models::{
    Aspect, Content, Issue, IssueKind, Severity, ValidationResult,
};

/// Fraction of subheadings allowed to carry the focus keyword before the
/// overuse check fires.
const SUBHEADING_KEYWORD_MAX_RATIO: f64 = 0.75;

pub struct IssueDetector {
    thresholds: ThresholdsConfig,
    known_titles: Vec<String>,
}

impl IssueDetector {
    pub fn new(thresholds: ThresholdsConfig) -> IssueDetector {
        IssueDetector {
            thresholds,
            known_titles: Vec::new(),
        }
    }

    /// Titles already published elsewhere; used by the duplicate check.
    pub fn with_known_titles(mut self, titles: Vec<String>) -> IssueDetector {
        self.known_titles = titles;
        self
    }

    /// Run every aspect check and collect the issues.
    pub fn detect_all_issues(
        &self,
        content: &Content,
        focus_keyword: &str,
        secondary_keywords: &[String],
    ) -> Vec<Issue> {
        let mut issues = Vec::new();
        for aspect in Aspect::ALL {
            issues.extend(self.detect_aspect(aspect, content, focus_keyword, secondary_keywords));
        }
        issues
    }

    pub fn detect_aspect(
        &self,
        aspect: Aspect,
        content: &Content,
        focus_keyword: &str,
        _secondary_keywords: &[String],
    ) -> Vec<Issue> {
        match aspect {
            Aspect::MetaDescription => self.check_meta_description(content, focus_keyword),
            Aspect::KeywordDensity => self.check_keyword_density(content, focus_keyword),
            Aspect::Readability => self.check_readability(content),
            Aspect::Title => self.check_title(content, focus_keyword),
            Aspect::Images => self.check_images(content, focus_keyword),
        }
    }

    fn check_meta_description(&self, content: &Content, focus_keyword: &str) -> Vec<Issue> {
        let mut issues = Vec::new();
        let len = content.meta_description.chars().count();
        let target = format!(
            "{}-{} characters",
            self.thresholds.meta_description_min_length, self.thresholds.meta_description_max_length
        );

        if len < self.thresholds.meta_description_min_length {
            issues.push(Issue::new(
                IssueKind::MetaDescriptionTooShort,
                format!("{} characters", len),
                target.clone(),
                "Meta description is shorter than the minimum length",
            ));
        } else if len > self.thresholds.meta_description_max_length {
            issues.push(Issue::new(
                IssueKind::MetaDescriptionTooLong,
                format!("{} characters", len),
                target,
                "Meta description exceeds the maximum length",
            ));
        }

        if !focus_keyword.is_empty()
            && !analysis::contains_keyword(&content.meta_description, focus_keyword)
        {
            issues.push(Issue::new(
                IssueKind::MetaDescriptionMissingKeyword,
                "keyword absent",
                format!("'{}' present", focus_keyword),
                "Meta description does not mention the focus keyword",
            ));
        }
        issues
    }

    fn check_keyword_density(&self, content: &Content, focus_keyword: &str) -> Vec<Issue> {
        let mut issues = Vec::new();
        if focus_keyword.is_empty() {
            return issues;
        }

        let prose = analysis::strip_markup(&content.body);
        let density = analysis::keyword_density(&prose, focus_keyword);
        let target = format!(
            "{:.2}%-{:.2}%",
            self.thresholds.keyword_density_min, self.thresholds.keyword_density_max
        );

        if density < self.thresholds.keyword_density_min {
            issues.push(Issue::new(
                IssueKind::KeywordDensityLow,
                format!("{:.2}%", density),
                target.clone(),
                "Focus keyword density is below the minimum",
            ));
        } else if density > self.thresholds.keyword_density_max {
            issues.push(Issue::new(
                IssueKind::KeywordDensityHigh,
                format!("{:.2}%", density),
                target,
                "Focus keyword density is above the maximum",
            ));
        }

        let first = analysis::first_paragraph(&content.body);
        if !first.is_empty() && !analysis::contains_keyword(&first, focus_keyword) {
            issues.push(Issue::new(
                IssueKind::KeywordMissingInFirstParagraph,
                "keyword absent",
                format!("'{}' in opening paragraph", focus_keyword),
                "Opening paragraph does not mention the focus keyword",
            ));
        }

        let heading_list = analysis::headings(&content.body);
        if heading_list.len() > 1 {
            let with_keyword = heading_list
                .iter()
                .filter(|h| analysis::contains_keyword(h, focus_keyword))
                .count();
            let ratio = with_keyword as f64 / heading_list.len() as f64;
            if ratio > SUBHEADING_KEYWORD_MAX_RATIO {
                issues.push(Issue::new(
                    IssueKind::SubheadingKeywordOveruse,
                    format!("{}/{} subheadings", with_keyword, heading_list.len()),
                    format!("at most {:.0}%", SUBHEADING_KEYWORD_MAX_RATIO * 100.0),
                    "Focus keyword appears in too many subheadings",
                ));
            }
        }
        issues
    }

    fn check_readability(&self, content: &Content) -> Vec<Issue> {
        let mut issues = Vec::new();
        let prose = analysis::strip_markup(&content.body);

        let flesch = analysis::flesch_score(&prose);
        if flesch < self.thresholds.flesch_score_min {
            issues.push(Issue::new(
                IssueKind::FleschScoreLow,
                format!("{:.1}", flesch),
                format!(">= {:.1}", self.thresholds.flesch_score_min),
                "Flesch reading ease is below the target",
            ));
        }

        let long_pct = analysis::long_sentence_pct(&prose, self.thresholds.max_sentence_words);
        if long_pct > self.thresholds.long_sentence_pct_max {
            let locations: Vec<String> = analysis::sentences(&prose)
                .iter()
                .enumerate()
                .filter(|(_, s)| analysis::word_count(s) > self.thresholds.max_sentence_words)
                .map(|(i, _)| format!("sentence {}", i + 1))
                .collect();
            issues.push(
                Issue::new(
                    IssueKind::LongSentences,
                    format!("{:.1}% of sentences", long_pct),
                    format!(
                        "<= {:.1}% over {} words",
                        self.thresholds.long_sentence_pct_max, self.thresholds.max_sentence_words
                    ),
                    "Too many sentences exceed the word limit",
                )
                .with_locations(locations),
            );
        }

        let long_paragraphs: Vec<String> = analysis::paragraphs(&content.body)
            .iter()
            .enumerate()
            .filter(|(_, p)| analysis::word_count(p) > self.thresholds.max_paragraph_words)
            .map(|(i, _)| format!("paragraph {}", i + 1))
            .collect();
        if !long_paragraphs.is_empty() {
            issues.push(
                Issue::new(
                    IssueKind::LongParagraphs,
                    format!("{} paragraphs", long_paragraphs.len()),
                    format!("<= {} words each", self.thresholds.max_paragraph_words),
                    "Some paragraphs exceed the word limit",
                )
                .with_locations(long_paragraphs),
            );
        }

        let passive = analysis::passive_voice_pct(&prose);
        if passive > self.thresholds.passive_voice_pct_max {
            issues.push(Issue::new(
                IssueKind::PassiveVoiceHigh,
                format!("{:.1}%", passive),
                format!("<= {:.1}%", self.thresholds.passive_voice_pct_max),
                "Too many sentences use passive voice",
            ));
        }

        let transition = analysis::transition_word_pct(&prose);
        if transition < self.thresholds.transition_word_pct_min {
            issues.push(Issue::new(
                IssueKind::TransitionWordsLow,
                format!("{:.1}%", transition),
                format!(">= {:.1}%", self.thresholds.transition_word_pct_min),
                "Too few sentences contain transition words",
            ));
        }
        issues
    }

    fn check_title(&self, content: &Content, focus_keyword: &str) -> Vec<Issue> {
        let mut issues = Vec::new();
        let len = content.title.chars().count();
        let target = format!(
            "{}-{} characters",
            self.thresholds.title_min_length, self.thresholds.title_max_length
        );

        if len < self.thresholds.title_min_length {
            issues.push(Issue::new(
                IssueKind::TitleTooShort,
                format!("{} characters", len),
                target.clone(),
                "Title is shorter than the minimum length",
            ));
        } else if len > self.thresholds.title_max_length {
            issues.push(Issue::new(
                IssueKind::TitleTooLong,
                format!("{} characters", len),
                target,
                "Title exceeds the maximum length",
            ));
        }

        if !focus_keyword.is_empty() && !analysis::contains_keyword(&content.title, focus_keyword) {
            issues.push(Issue::new(
                IssueKind::TitleMissingKeyword,
                "keyword absent",
                format!("'{}' present", focus_keyword),
                "Title does not mention the focus keyword",
            ));
        }

        let lower = content.title.to_lowercase();
        if self
            .known_titles
            .iter()
            .any(|t| t.to_lowercase() == lower)
        {
            issues.push(Issue::new(
                IssueKind::TitleDuplicate,
                content.title.clone(),
                "a unique title",
                "Title duplicates an existing published title",
            ));
        }
        issues
    }

    fn check_images(&self, content: &Content, focus_keyword: &str) -> Vec<Issue> {
        let mut issues = Vec::new();

        if content.image_prompts.len() < self.thresholds.min_image_count {
            issues.push(Issue::new(
                IssueKind::ImagesMissing,
                format!("{} images", content.image_prompts.len()),
                format!(">= {} images", self.thresholds.min_image_count),
                "Content has fewer images than required",
            ));
            return issues;
        }

        let missing_alt: Vec<String> = content
            .image_prompts
            .iter()
            .enumerate()
            .filter(|(_, img)| img.alt.trim().is_empty())
            .map(|(i, _)| format!("image {}", i + 1))
            .collect();
        if !missing_alt.is_empty() {
            issues.push(
                Issue::new(
                    IssueKind::ImageAltMissing,
                    format!("{} images without alt text", missing_alt.len()),
                    "alt text on every image",
                    "Some images are missing alt text",
                )
                .with_locations(missing_alt),
            );
        }

        if !focus_keyword.is_empty() {
            let any_with_keyword = content
                .image_prompts
                .iter()
                .any(|img| analysis::contains_keyword(&img.alt, focus_keyword));
            if !any_with_keyword {
                issues.push(Issue::new(
                    IssueKind::ImageAltMissingKeyword,
                    "keyword absent from all alt text",
                    format!("'{}' in at least one alt text", focus_keyword),
                    "No image alt text mentions the focus keyword",
                ));
            }
        }
        issues
    }
}

/// Compliance score for a set of issues. Each issue deducts
/// `0.8 * weight * severity_weight * 10` points; the result is clamped
/// to [0, 100].
pub fn compliance_score(issues: &[Issue]) -> f64 {
    let deduction: f64 = issues
        .iter()
        .map(|i| 0.8 * i.weight * i.severity.weight() * 10.0)
        .sum();
    (100.0 - deduction).clamp(0.0, 100.0)
}

pub fn is_compliant(score: f64) -> bool {
    score >= 100.0
}

/// Bucket issues by severity into a [`ValidationResult`].
pub fn result_from_issues(
    issues: Vec<Issue>,
    content: &Content,
    focus_keyword: &str,
) -> ValidationResult {
    let score = compliance_score(&issues);
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut suggestions = Vec::new();
    for issue in issues {
        match issue.severity {
            Severity::Critical => errors.push(issue),
            Severity::Major => warnings.push(issue),
            Severity::Minor => suggestions.push(issue),
        }
    }
    ValidationResult {
        is_valid: is_compliant(score),
        errors,
        warnings,
        suggestions,
        overall_score: score,
        corrected_content: None,
        corrections_made: Vec::new(),
        step_failures: Vec::new(),
        metrics: analysis::compute_metrics(content, focus_keyword),
    }
}

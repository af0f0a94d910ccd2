//! Core data models used throughout the optimization engine.
//!
//! These types represent the content records, detected issues, and validation
//! results that flow through the multi-pass pipeline.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Prompt for a generated image plus its alt text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePrompt {
    pub prompt: String,
    #[serde(default)]
    pub alt: String,
}

/// An internal or external link carried in the content record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
    #[serde(default)]
    pub anchor: String,
}

/// A content record as it enters and leaves the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "content", default)]
    pub body: String,
    #[serde(default)]
    pub meta_description: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub primary_keyword: String,
    #[serde(default)]
    pub secondary_keywords: Vec<String>,
    #[serde(default)]
    pub image_prompts: Vec<ImagePrompt>,
    #[serde(default)]
    pub internal_links: Vec<Link>,
    #[serde(default)]
    pub external_links: Vec<Link>,
}

impl Content {
    /// Hash over every field a corrector may touch. Cache keys derive from
    /// this, so any correction invalidates dependent entries.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.title.as_bytes());
        hasher.update([0]);
        hasher.update(self.body.as_bytes());
        hasher.update([0]);
        hasher.update(self.meta_description.as_bytes());
        hasher.update([0]);
        hasher.update(self.excerpt.as_bytes());
        hasher.update([0]);
        hasher.update(self.primary_keyword.as_bytes());
        for kw in &self.secondary_keywords {
            hasher.update([1]);
            hasher.update(kw.as_bytes());
        }
        for img in &self.image_prompts {
            hasher.update([1]);
            hasher.update(img.prompt.as_bytes());
            hasher.update([0]);
            hasher.update(img.alt.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

/// The five validation aspects, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aspect {
    MetaDescription,
    KeywordDensity,
    Readability,
    Title,
    Images,
}

impl Aspect {
    /// Pipeline order: meta first, images last.
    pub const ALL: [Aspect; 5] = [
        Aspect::MetaDescription,
        Aspect::KeywordDensity,
        Aspect::Readability,
        Aspect::Title,
        Aspect::Images,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Aspect::MetaDescription => "meta_description",
            Aspect::KeywordDensity => "keyword_density",
            Aspect::Readability => "readability",
            Aspect::Title => "title",
            Aspect::Images => "images",
        }
    }

    pub fn parse(s: &str) -> Option<Aspect> {
        match s {
            "meta_description" => Some(Aspect::MetaDescription),
            "keyword_density" => Some(Aspect::KeywordDensity),
            "readability" => Some(Aspect::Readability),
            "title" => Some(Aspect::Title),
            "images" => Some(Aspect::Images),
            _ => None,
        }
    }
}

impl std::fmt::Display for Aspect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issue severity. Critical issues block compliance outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minor,
    Major,
    Critical,
}

impl Severity {
    /// Multiplier applied in the compliance score deduction.
    pub fn weight(&self) -> f64 {
        match self {
            Severity::Critical => 3.0,
            Severity::Major => 2.0,
            Severity::Minor => 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Major => "major",
            Severity::Minor => "minor",
        }
    }
}

/// Every distinct issue the detector can raise.
///
/// Severity, priority, and weight are fixed per kind; correctors and the
/// retry manager branch on the kind, never on free-form strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MetaDescriptionTooShort,
    MetaDescriptionTooLong,
    MetaDescriptionMissingKeyword,
    KeywordDensityLow,
    KeywordDensityHigh,
    KeywordMissingInFirstParagraph,
    SubheadingKeywordOveruse,
    FleschScoreLow,
    LongSentences,
    LongParagraphs,
    PassiveVoiceHigh,
    TransitionWordsLow,
    TitleTooShort,
    TitleTooLong,
    TitleMissingKeyword,
    TitleDuplicate,
    ImagesMissing,
    ImageAltMissing,
    ImageAltMissingKeyword,
}

impl IssueKind {
    pub fn severity(&self) -> Severity {
        match self {
            IssueKind::TitleMissingKeyword | IssueKind::TitleDuplicate => Severity::Critical,
            IssueKind::MetaDescriptionTooShort
            | IssueKind::MetaDescriptionTooLong
            | IssueKind::MetaDescriptionMissingKeyword
            | IssueKind::KeywordDensityLow
            | IssueKind::KeywordDensityHigh
            | IssueKind::FleschScoreLow
            | IssueKind::TitleTooShort
            | IssueKind::TitleTooLong => Severity::Major,
            IssueKind::KeywordMissingInFirstParagraph
            | IssueKind::SubheadingKeywordOveruse
            | IssueKind::LongSentences
            | IssueKind::LongParagraphs
            | IssueKind::PassiveVoiceHigh
            | IssueKind::TransitionWordsLow
            | IssueKind::ImagesMissing
            | IssueKind::ImageAltMissing
            | IssueKind::ImageAltMissingKeyword => Severity::Minor,
        }
    }

    /// Correction order within a pass: higher priority first.
    pub fn priority(&self) -> u8 {
        match self {
            IssueKind::TitleMissingKeyword | IssueKind::TitleDuplicate => 9,
            IssueKind::MetaDescriptionMissingKeyword => 8,
            IssueKind::KeywordDensityLow | IssueKind::KeywordDensityHigh => 7,
            IssueKind::MetaDescriptionTooShort | IssueKind::MetaDescriptionTooLong => 6,
            IssueKind::TitleTooShort | IssueKind::TitleTooLong => 6,
            IssueKind::FleschScoreLow => 5,
            IssueKind::KeywordMissingInFirstParagraph => 4,
            IssueKind::PassiveVoiceHigh => 4,
            IssueKind::LongSentences | IssueKind::LongParagraphs => 3,
            IssueKind::SubheadingKeywordOveruse => 2,
            IssueKind::TransitionWordsLow => 2,
            IssueKind::ImagesMissing | IssueKind::ImageAltMissing | IssueKind::ImageAltMissingKeyword => 2,
        }
    }

    /// Contribution of the kind to the score deduction.
    pub fn weight(&self) -> f64 {
        match self {
            IssueKind::TitleMissingKeyword | IssueKind::TitleDuplicate => 3.0,
            IssueKind::MetaDescriptionMissingKeyword => 2.5,
            IssueKind::KeywordDensityLow | IssueKind::KeywordDensityHigh => 2.0,
            IssueKind::MetaDescriptionTooShort | IssueKind::MetaDescriptionTooLong => 1.5,
            IssueKind::TitleTooShort | IssueKind::TitleTooLong => 1.5,
            IssueKind::FleschScoreLow => 1.5,
            IssueKind::KeywordMissingInFirstParagraph => 1.0,
            IssueKind::PassiveVoiceHigh => 1.0,
            IssueKind::LongSentences | IssueKind::LongParagraphs => 1.0,
            IssueKind::SubheadingKeywordOveruse => 0.5,
            IssueKind::TransitionWordsLow => 0.5,
            IssueKind::ImagesMissing | IssueKind::ImageAltMissing | IssueKind::ImageAltMissingKeyword => 0.5,
        }
    }

    pub fn aspect(&self) -> Aspect {
        match self {
            IssueKind::MetaDescriptionTooShort
            | IssueKind::MetaDescriptionTooLong
            | IssueKind::MetaDescriptionMissingKeyword => Aspect::MetaDescription,
            IssueKind::KeywordDensityLow
            | IssueKind::KeywordDensityHigh
            | IssueKind::KeywordMissingInFirstParagraph
            | IssueKind::SubheadingKeywordOveruse => Aspect::KeywordDensity,
            IssueKind::FleschScoreLow
            | IssueKind::LongSentences
            | IssueKind::LongParagraphs
            | IssueKind::PassiveVoiceHigh
            | IssueKind::TransitionWordsLow => Aspect::Readability,
            IssueKind::TitleTooShort
            | IssueKind::TitleTooLong
            | IssueKind::TitleMissingKeyword
            | IssueKind::TitleDuplicate => Aspect::Title,
            IssueKind::ImagesMissing
            | IssueKind::ImageAltMissing
            | IssueKind::ImageAltMissingKeyword => Aspect::Images,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::MetaDescriptionTooShort => "meta_description_too_short",
            IssueKind::MetaDescriptionTooLong => "meta_description_too_long",
            IssueKind::MetaDescriptionMissingKeyword => "meta_description_missing_keyword",
            IssueKind::KeywordDensityLow => "keyword_density_low",
            IssueKind::KeywordDensityHigh => "keyword_density_high",
            IssueKind::KeywordMissingInFirstParagraph => "keyword_missing_in_first_paragraph",
            IssueKind::SubheadingKeywordOveruse => "subheading_keyword_overuse",
            IssueKind::FleschScoreLow => "flesch_score_low",
            IssueKind::LongSentences => "long_sentences",
            IssueKind::LongParagraphs => "long_paragraphs",
            IssueKind::PassiveVoiceHigh => "passive_voice_high",
            IssueKind::TransitionWordsLow => "transition_words_low",
            IssueKind::TitleTooShort => "title_too_short",
            IssueKind::TitleTooLong => "title_too_long",
            IssueKind::TitleMissingKeyword => "title_missing_keyword",
            IssueKind::TitleDuplicate => "title_duplicate",
            IssueKind::ImagesMissing => "images_missing",
            IssueKind::ImageAltMissing => "image_alt_missing",
            IssueKind::ImageAltMissingKeyword => "image_alt_missing_keyword",
        }
    }
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single detected issue with its measured and target values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub current_value: String,
    pub target_value: String,
    #[serde(default)]
    pub locations: Vec<String>,
    pub description: String,
    pub priority: u8,
    pub weight: f64,
}

impl Issue {
    pub fn new(kind: IssueKind, current: impl Into<String>, target: impl Into<String>, description: impl Into<String>) -> Issue {
        Issue {
            kind,
            severity: kind.severity(),
            current_value: current.into(),
            target_value: target.into(),
            locations: Vec::new(),
            description: description.into(),
            priority: kind.priority(),
            weight: kind.weight(),
        }
    }

    pub fn with_locations(mut self, locations: Vec<String>) -> Issue {
        self.locations = locations;
        self
    }
}

/// Measured text metrics reported alongside every validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentMetrics {
    pub word_count: usize,
    pub sentence_count: usize,
    pub paragraph_count: usize,
    pub avg_sentence_length: f64,
    pub keyword_count: usize,
    pub keyword_density: f64,
    pub flesch_score: f64,
    pub passive_voice_pct: f64,
    pub transition_word_pct: f64,
    pub title_length: usize,
    pub meta_description_length: usize,
    pub image_count: usize,
}

/// Outcome of validating one aspect, or of the cross-aspect final check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
    pub suggestions: Vec<Issue>,
    pub overall_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected_content: Option<Content>,
    #[serde(default)]
    pub corrections_made: Vec<String>,
    /// Aspect steps whose corrector failed; the pipeline records the error
    /// here and keeps going.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub step_failures: Vec<String>,
    pub metrics: ContentMetrics,
}

impl ValidationResult {
    /// Synthetic failed result used when validation itself errors out.
    pub fn failure(description: impl Into<String>) -> ValidationResult {
        ValidationResult {
            is_valid: false,
            errors: Vec::new(),
            warnings: Vec::new(),
            suggestions: Vec::new(),
            overall_score: 0.0,
            corrected_content: None,
            corrections_made: Vec::new(),
            step_failures: vec![description.into()],
            metrics: ContentMetrics::default(),
        }
    }

    pub fn issue_count(&self) -> usize {
        self.errors.len() + self.warnings.len() + self.suggestions.len()
    }

    /// All issues across the three buckets, borrowed.
    pub fn all_issues(&self) -> impl Iterator<Item = &Issue> {
        self.errors
            .iter()
            .chain(self.warnings.iter())
            .chain(self.suggestions.iter())
    }
}

/// Why the optimizer loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    InitialCompliance,
    ComplianceAchieved,
    MaxIterationsReached,
    StagnationDetected,
    InsufficientImprovement,
    ValidationError,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationReason::InitialCompliance => "initial_compliance",
            TerminationReason::ComplianceAchieved => "compliance_achieved",
            TerminationReason::MaxIterationsReached => "max_iterations_reached",
            TerminationReason::StagnationDetected => "stagnation_detected",
            TerminationReason::InsufficientImprovement => "insufficient_improvement",
            TerminationReason::ValidationError => "validation_error",
        }
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Pure text analysis.
//!
//! Everything in this module is a deterministic function of its input text:
//! markup stripping, word/sentence/paragraph segmentation, keyword density,
//! readability scoring, passive-voice and transition-word rates. No I/O,
//! no configuration; thresholds are applied by the detector.

use crate::models::{Content, ContentMetrics};

/// Strip HTML tags and common markdown syntax, leaving prose.
pub fn strip_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }

    let mut prose = String::with_capacity(out.len());
    for line in out.lines() {
        let line = line.trim_start_matches('#').trim_start();
        let line = line.strip_prefix("- ").unwrap_or(line);
        let line = line.strip_prefix("* ").unwrap_or(line);
        prose.push_str(&strip_inline_markdown(line));
        prose.push('\n');
    }
    prose
}

/// Drop emphasis markers, inline code ticks, and collapse `[text](url)`
/// links to their anchor text.
fn strip_inline_markdown(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '*' | '_' | '`' => {}
            '[' => {
                let mut anchor = String::new();
                for inner in chars.by_ref() {
                    if inner == ']' {
                        break;
                    }
                    anchor.push(inner);
                }
                if chars.peek() == Some(&'(') {
                    chars.next();
                    for inner in chars.by_ref() {
                        if inner == ')' {
                            break;
                        }
                    }
                }
                out.push_str(&anchor);
            }
            c => out.push(c),
        }
    }
    out
}

/// Words in the text, punctuation-trimmed, empty tokens dropped.
pub fn words(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .collect()
}

pub fn word_count(text: &str) -> usize {
    words(text).len()
}

/// Sentences split on terminal punctuation. Empty fragments are dropped.
pub fn sentences(text: &str) -> Vec<&str> {
    text.split(|c| c == '.' || c == '!' || c == '?')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Paragraphs split on blank lines; heading-only blocks are excluded.
pub fn paragraphs(text: &str) -> Vec<&str> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty() && !p.lines().all(|l| l.trim_start().starts_with('#')))
        .collect()
}

/// First prose paragraph of the body, markup-stripped.
pub fn first_paragraph(body: &str) -> String {
    paragraphs(body)
        .first()
        .map(|p| strip_markup(p))
        .unwrap_or_default()
}

/// Markdown heading lines, with their marker prefix removed.
pub fn headings(body: &str) -> Vec<String> {
    body.lines()
        .filter(|l| l.trim_start().starts_with('#'))
        .map(|l| l.trim_start().trim_start_matches('#').trim().to_string())
        .filter(|h| !h.is_empty())
        .collect()
}

/// Case-insensitive whole-phrase occurrence count.
pub fn keyword_occurrences(text: &str, keyword: &str) -> usize {
    if keyword.trim().is_empty() {
        return 0;
    }
    let haystack = text.to_lowercase();
    let needle = keyword.trim().to_lowercase();
    let mut count = 0;
    let mut pos = 0;
    while let Some(found) = haystack[pos..].find(&needle) {
        let start = pos + found;
        let end = start + needle.len();
        let before_ok = start == 0
            || !haystack[..start]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric());
        let after_ok = end == haystack.len()
            || !haystack[end..].chars().next().is_some_and(|c| c.is_alphanumeric());
        if before_ok && after_ok {
            count += 1;
        }
        pos = end;
    }
    count
}

pub fn contains_keyword(text: &str, keyword: &str) -> bool {
    keyword_occurrences(text, keyword) > 0
}

/// Keyword density as a percentage of total words.
pub fn keyword_density(text: &str, keyword: &str) -> f64 {
    let total = word_count(text);
    if total == 0 {
        return 0.0;
    }
    keyword_occurrences(text, keyword) as f64 / total as f64 * 100.0
}

/// Vowel-group syllable estimate. Trailing silent `e` is discounted;
/// every word counts at least one.
fn syllables(word: &str) -> usize {
    let lower = word.to_lowercase();
    let mut count = 0;
    let mut prev_vowel = false;
    for ch in lower.chars() {
        let is_vowel = matches!(ch, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
        if is_vowel && !prev_vowel {
            count += 1;
        }
        prev_vowel = is_vowel;
    }
    if lower.ends_with('e') && !lower.ends_with("le") && count > 1 {
        count -= 1;
    }
    count.max(1)
}

/// Flesch Reading Ease over prose text, clamped to [0, 100].
pub fn flesch_score(text: &str) -> f64 {
    let sentence_list = sentences(text);
    let word_list = words(text);
    if sentence_list.is_empty() || word_list.is_empty() {
        return 0.0;
    }
    let syllable_total: usize = word_list.iter().map(|w| syllables(w)).sum();
    let words_per_sentence = word_list.len() as f64 / sentence_list.len() as f64;
    let syllables_per_word = syllable_total as f64 / word_list.len() as f64;
    let score = 206.835 - 1.015 * words_per_sentence - 84.6 * syllables_per_word;
    score.clamp(0.0, 100.0)
}

const BE_VERBS: [&str; 8] = [
    "is", "are", "was", "were", "be", "been", "being", "am",
];

const IRREGULAR_PARTICIPLES: [&str; 16] = [
    "made", "done", "seen", "known", "given", "taken", "found", "written", "held", "shown",
    "built", "kept", "sent", "left", "set", "chosen",
];

fn is_passive(sentence: &str) -> bool {
    let tokens: Vec<String> = words(sentence).iter().map(|w| w.to_lowercase()).collect();
    for (i, token) in tokens.iter().enumerate() {
        if BE_VERBS.contains(&token.as_str()) {
            // Look at the next two tokens for a past participle.
            for next in tokens.iter().skip(i + 1).take(2) {
                if (next.ends_with("ed") && next.len() > 3)
                    || IRREGULAR_PARTICIPLES.contains(&next.as_str())
                {
                    return true;
                }
            }
        }
    }
    false
}

/// Percentage of sentences in passive voice, per a be-verb + participle
/// heuristic.
pub fn passive_voice_pct(text: &str) -> f64 {
    let sentence_list = sentences(text);
    if sentence_list.is_empty() {
        return 0.0;
    }
    let passive = sentence_list.iter().filter(|s| is_passive(s)).count();
    passive as f64 / sentence_list.len() as f64 * 100.0
}

const TRANSITION_WORDS: [&str; 24] = [
    "however",
    "moreover",
    "furthermore",
    "therefore",
    "additionally",
    "consequently",
    "meanwhile",
    "similarly",
    "likewise",
    "instead",
    "nevertheless",
    "also",
    "finally",
    "first",
    "second",
    "next",
    "then",
    "because",
    "although",
    "thus",
    "overall",
    "indeed",
    "ultimately",
    "besides",
];

const TRANSITION_PHRASES: [&str; 5] = [
    "in addition",
    "for example",
    "in fact",
    "as a result",
    "on the other hand",
];

pub fn has_transition(sentence: &str) -> bool {
    let lower = sentence.to_lowercase();
    if TRANSITION_PHRASES.iter().any(|p| lower.contains(p)) {
        return true;
    }
    words(&lower)
        .iter()
        .any(|w| TRANSITION_WORDS.contains(w))
}

/// Percentage of sentences containing a transition word or phrase.
pub fn transition_word_pct(text: &str) -> f64 {
    let sentence_list = sentences(text);
    if sentence_list.is_empty() {
        return 0.0;
    }
    let with = sentence_list.iter().filter(|s| has_transition(s)).count();
    with as f64 / sentence_list.len() as f64 * 100.0
}

/// Percentage of sentences longer than `max_words`.
pub fn long_sentence_pct(text: &str, max_words: usize) -> f64 {
    let sentence_list = sentences(text);
    if sentence_list.is_empty() {
        return 0.0;
    }
    let long = sentence_list
        .iter()
        .filter(|s| word_count(s) > max_words)
        .count();
    long as f64 / sentence_list.len() as f64 * 100.0
}

/// Full metric sweep over one content record.
pub fn compute_metrics(content: &Content, focus_keyword: &str) -> ContentMetrics {
    let prose = strip_markup(&content.body);
    let sentence_list = sentences(&prose);
    let total_words = word_count(&prose);
    let avg_sentence_length = if sentence_list.is_empty() {
        0.0
    } else {
        total_words as f64 / sentence_list.len() as f64
    };

    ContentMetrics {
        word_count: total_words,
        sentence_count: sentence_list.len(),
        paragraph_count: paragraphs(&content.body).len(),
        avg_sentence_length,
        keyword_count: keyword_occurrences(&prose, focus_keyword),
        keyword_density: keyword_density(&prose, focus_keyword),
        flesch_score: flesch_score(&prose),
        passive_voice_pct: passive_voice_pct(&prose),
        transition_word_pct: transition_word_pct(&prose),
        title_length: content.title.chars().count(),
        meta_description_length: content.meta_description.chars().count(),
        image_count: content.image_prompts.len(),
    }
}

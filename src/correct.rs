//! Built-in correctors, one per aspect.
//!
//! Each corrector is a deterministic heuristic given its RNG: template and
//! synonym choices come from the injected seeded generator, so a session
//! replays identically under the same seed. Correctors never mutate their
//! input; the pipeline re-validates whatever they return.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::Rng;

use crate::analysis;
use crate::models::{Aspect, Content, ImagePrompt, IssueKind};
use crate::traits::{CorrectionOptions, Corrector};

fn pick<'a>(rng: &mut StdRng, pool: &[&'a str]) -> &'a str {
    pool[rng.gen_range(0..pool.len())]
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn lowercase_first(s: &str) -> String {
    let first_word = s.split_whitespace().next().unwrap_or("");
    // Leave acronyms and "I" alone.
    if first_word.len() > 1 && first_word.chars().all(|c| c.is_uppercase()) || first_word == "I" {
        return s.to_string();
    }
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn ensure_terminal(s: &str) -> String {
    let trimmed = s.trim_end();
    if trimmed.is_empty() || trimmed.ends_with(['.', '!', '?']) {
        trimmed.to_string()
    } else {
        format!("{}.", trimmed)
    }
}

/// Cut at the last word boundary within `max_chars`, closing with a period.
fn truncate_prose(s: &str, max_chars: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_chars {
        return s.to_string();
    }
    let head: String = chars[..max_chars].iter().collect();
    let cut = match head.rfind(' ') {
        Some(idx) => head[..idx].trim_end_matches([',', ';', ':']).to_string(),
        None => head,
    };
    ensure_terminal(&cut)
}

/// Like [`truncate_prose`] but without the closing period; titles do not
/// end with punctuation.
fn truncate_title(s: &str, max_chars: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_chars {
        return s.to_string();
    }
    let head: String = chars[..max_chars].iter().collect();
    match head.rfind(' ') {
        Some(idx) => head[..idx].trim_end_matches([',', ';', ':', '—', '-']).trim_end().to_string(),
        None => head,
    }
}

/// Byte offset of the last whole-word, case-insensitive occurrence.
fn find_last_occurrence(haystack: &str, needle: &str) -> Option<usize> {
    let lower = haystack.to_ascii_lowercase();
    let needle = needle.to_ascii_lowercase();
    if needle.is_empty() {
        return None;
    }
    let mut last = None;
    let mut pos = 0;
    while let Some(found) = lower[pos..].find(&needle) {
        let start = pos + found;
        let end = start + needle.len();
        let before_ok = start == 0
            || !lower[..start]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric());
        let after_ok = end == lower.len()
            || !lower[end..].chars().next().is_some_and(|c| c.is_alphanumeric());
        if before_ok && after_ok {
            last = Some(start);
        }
        pos = end;
    }
    last
}

fn replace_last_keyword(body: &str, keyword: &str, replacement: &str) -> Option<String> {
    let start = find_last_occurrence(body, keyword)?;
    let end = start + keyword.len();
    Some(format!("{}{}{}", &body[..start], replacement, &body[end..]))
}

/// Sentences with their terminators kept, for reassembly.
fn split_sentences_keep(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            let sentence = current.trim().to_string();
            if !sentence.is_empty() {
                out.push(sentence);
            }
            current.clear();
        }
    }
    let rest = current.trim();
    if !rest.is_empty() {
        out.push(rest.to_string());
    }
    out
}

/// Apply `f` to every prose block, leaving heading blocks untouched.
fn rewrite_prose_blocks<F: FnMut(&str) -> String>(body: &str, mut f: F) -> String {
    body.split("\n\n")
        .map(|block| {
            let trimmed = block.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                block.to_string()
            } else {
                f(trimmed)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

// ═══════════════════════════════════════════════════════════════════════
// Meta description
// ═══════════════════════════════════════════════════════════════════════

const META_LEAD_TEMPLATES: [&str; 3] = [
    "Discover how {keyword} works in practice.",
    "Learn {keyword} through clear, proven steps.",
    "See what {keyword} can do for your results.",
];

const META_PAD_SENTENCES: [&str; 4] = [
    "This guide covers the essentials step by step.",
    "Get clear advice you can apply right away.",
    "See real examples and avoid the common mistakes.",
    "Everything here comes from hands-on experience.",
];

pub struct MetaDescriptionCorrector;

impl Corrector for MetaDescriptionCorrector {
    fn aspect(&self) -> Aspect {
        Aspect::MetaDescription
    }

    fn name(&self) -> &str {
        "meta_description"
    }

    fn description(&self) -> &str {
        "Bring the meta description into length bounds with the keyword present"
    }

    fn correct(
        &self,
        content: &Content,
        focus_keyword: &str,
        _secondary_keywords: &[String],
        opts: &CorrectionOptions,
        rng: &mut StdRng,
    ) -> Result<Content> {
        let t = &opts.thresholds;
        let min = t.meta_description_min_length;
        let max = t.meta_description_max_length;
        let fill_target = (min as i64 + opts.target_length_delta).clamp(min as i64, max as i64 - 1)
            as usize;

        let mut meta = ensure_terminal(content.meta_description.trim());

        if !focus_keyword.is_empty() && !analysis::contains_keyword(&meta, focus_keyword) {
            let lead = pick(rng, &META_LEAD_TEMPLATES).replace("{keyword}", focus_keyword);
            meta = if meta.is_empty() {
                lead
            } else {
                format!("{} {}", lead, meta)
            };
        }

        let mut pad_index = rng.gen_range(0..META_PAD_SENTENCES.len());
        while meta.chars().count() < fill_target {
            let pad = META_PAD_SENTENCES[pad_index % META_PAD_SENTENCES.len()];
            pad_index += 1;
            meta = format!("{} {}", ensure_terminal(&meta), pad).trim().to_string();
        }

        if meta.chars().count() > max {
            meta = truncate_prose(&meta, max);
            // The keyword can only be lost here if it lived past the cut;
            // re-anchor it at the front and trim again.
            if !focus_keyword.is_empty() && !analysis::contains_keyword(&meta, focus_keyword) {
                let lead = pick(rng, &META_LEAD_TEMPLATES).replace("{keyword}", focus_keyword);
                meta = truncate_prose(&format!("{} {}", lead, meta), max);
            }
        }

        let mut fixed = content.clone();
        fixed.meta_description = meta;
        Ok(fixed)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Keyword density
// ═══════════════════════════════════════════════════════════════════════

const DENSITY_OPEN_TEMPLATES: [&str; 3] = [
    "{Keyword} is the subject here.",
    "{Keyword} sits at the center of this piece.",
    "This is a close look at {keyword}.",
];

const DENSITY_FILL_TEMPLATES: [&str; 4] = [
    "Moreover, {keyword} rewards steady practice.",
    "Also, {keyword} pays off over time.",
    "Indeed, {keyword} makes the difference here.",
    "Therefore, {keyword} deserves the attention.",
];

const GENERIC_SUBSTITUTES: [&str; 3] = ["it", "this approach", "the approach"];

/// Loop cap for incremental density adjustments.
const DENSITY_ADJUST_LIMIT: usize = 50;

pub struct KeywordDensityCorrector;

impl Corrector for KeywordDensityCorrector {
    fn aspect(&self) -> Aspect {
        Aspect::KeywordDensity
    }

    fn name(&self) -> &str {
        "keyword_density"
    }

    fn description(&self) -> &str {
        "Raise or lower focus keyword usage into the configured band"
    }

    fn correct(
        &self,
        content: &Content,
        focus_keyword: &str,
        secondary_keywords: &[String],
        opts: &CorrectionOptions,
        rng: &mut StdRng,
    ) -> Result<Content> {
        let t = &opts.thresholds;
        let mut fixed = content.clone();
        if focus_keyword.is_empty() {
            return Ok(fixed);
        }

        // Opening paragraph first: it also raises density.
        let first = analysis::first_paragraph(&fixed.body);
        if !first.is_empty() && !analysis::contains_keyword(&first, focus_keyword) {
            let opener = pick(rng, &DENSITY_OPEN_TEMPLATES)
                .replace("{Keyword}", &capitalize_first(focus_keyword))
                .replace("{keyword}", focus_keyword);
            let mut seen_prose = false;
            fixed.body = fixed
                .body
                .split("\n\n")
                .map(|block| {
                    let trimmed = block.trim();
                    if !seen_prose && !trimmed.is_empty() && !trimmed.starts_with('#') {
                        seen_prose = true;
                        format!("{} {}", opener, trimmed)
                    } else {
                        block.to_string()
                    }
                })
                .collect::<Vec<_>>()
                .join("\n\n");
        }

        let density = analysis::keyword_density(&analysis::strip_markup(&fixed.body), focus_keyword);

        if density < t.keyword_density_min {
            for _ in 0..DENSITY_ADJUST_LIMIT {
                let prose = analysis::strip_markup(&fixed.body);
                if analysis::keyword_density(&prose, focus_keyword) >= t.keyword_density_min {
                    break;
                }
                let filler = pick(rng, &DENSITY_FILL_TEMPLATES)
                    .replace("{Keyword}", &capitalize_first(focus_keyword))
                    .replace("{keyword}", focus_keyword);
                fixed.body = format!("{} {}", ensure_terminal(&fixed.body), filler);
            }
        } else if density > t.keyword_density_max {
            // Retries trim deeper into the band.
            let reduction = opts.reduction_pct.min(0.9);
            let target =
                t.keyword_density_max - (t.keyword_density_max - t.keyword_density_min) * reduction;
            for _ in 0..DENSITY_ADJUST_LIMIT {
                let prose = analysis::strip_markup(&fixed.body);
                if analysis::keyword_density(&prose, focus_keyword) <= target
                    || analysis::keyword_occurrences(&prose, focus_keyword) <= 1
                {
                    break;
                }
                let substitute = if secondary_keywords.is_empty() {
                    pick(rng, &GENERIC_SUBSTITUTES).to_string()
                } else {
                    secondary_keywords[rng.gen_range(0..secondary_keywords.len())].clone()
                };
                match replace_last_keyword(&fixed.body, focus_keyword, &substitute) {
                    Some(body) => fixed.body = body,
                    None => break,
                }
            }
        }

        Ok(fixed)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Readability
// ═══════════════════════════════════════════════════════════════════════

const TRANSITION_POOL: [&str; 6] = [
    "However",
    "Moreover",
    "Also",
    "Meanwhile",
    "Similarly",
    "Additionally",
];

/// Upper bound on transition insertions per correction.
const TRANSITION_INSERT_LIMIT: usize = 20;

/// Splits long sentences and paragraphs and seeds transition words.
/// Flesch recovery comes from sentence splitting; there is no
/// word-substitution pass.
pub struct ReadabilityCorrector;

fn split_one_sentence(sentence: &str) -> String {
    let mid = sentence.len() / 2;
    let commas: Vec<usize> = sentence.match_indices(", ").map(|(i, _)| i).collect();
    if let Some(&best) = commas.iter().min_by_key(|&&i| i.abs_diff(mid)) {
        let head = sentence[..best].trim_end();
        let tail = sentence[best..].trim_start_matches(", ");
        return format!("{}. {}", head, capitalize_first(tail));
    }
    let ands: Vec<usize> = sentence.match_indices(" and ").map(|(i, _)| i).collect();
    if let Some(&best) = ands.iter().min_by_key(|&&i| i.abs_diff(mid)) {
        let head = sentence[..best].trim_end();
        let tail = &sentence[best + " and ".len()..];
        return format!("{}. Also, {}", head, tail);
    }
    sentence.to_string()
}

fn split_long_paragraph(block: &str, max_words: usize) -> String {
    if analysis::word_count(block) <= max_words {
        return block.to_string();
    }
    let sentence_list = split_sentences_keep(block);
    if sentence_list.len() < 2 {
        return block.to_string();
    }
    let total = analysis::word_count(block);
    let mut running = 0;
    let mut split_at = sentence_list.len() / 2;
    for (i, sentence) in sentence_list.iter().enumerate() {
        running += analysis::word_count(sentence);
        if running >= total / 2 {
            split_at = (i + 1).min(sentence_list.len() - 1);
            break;
        }
    }
    format!(
        "{}\n\n{}",
        sentence_list[..split_at].join(" "),
        sentence_list[split_at..].join(" ")
    )
}

fn inject_transition(body: &str, word: &str) -> Option<String> {
    let mut done = false;
    let rewritten = rewrite_prose_blocks(body, |block| {
        if done {
            return block.to_string();
        }
        let mut sentence_list = split_sentences_keep(block);
        for sentence in sentence_list.iter_mut() {
            if !analysis::has_transition(sentence) {
                *sentence = format!("{}, {}", word, lowercase_first(sentence));
                done = true;
                break;
            }
        }
        sentence_list.join(" ")
    });
    if done {
        Some(rewritten)
    } else {
        None
    }
}

impl Corrector for ReadabilityCorrector {
    fn aspect(&self) -> Aspect {
        Aspect::Readability
    }

    fn name(&self) -> &str {
        "readability"
    }

    fn description(&self) -> &str {
        "Split long sentences and paragraphs, seed transition words"
    }

    fn correct(
        &self,
        content: &Content,
        _focus_keyword: &str,
        _secondary_keywords: &[String],
        opts: &CorrectionOptions,
        rng: &mut StdRng,
    ) -> Result<Content> {
        let t = &opts.thresholds;
        let mut fixed = content.clone();

        fixed.body = rewrite_prose_blocks(&fixed.body, |block| {
            split_sentences_keep(block)
                .iter()
                .map(|s| {
                    if analysis::word_count(s) > t.max_sentence_words {
                        split_one_sentence(s)
                    } else {
                        s.clone()
                    }
                })
                .collect::<Vec<_>>()
                .join(" ")
        });

        fixed.body = rewrite_prose_blocks(&fixed.body, |block| {
            split_long_paragraph(block, t.max_paragraph_words)
        });

        for _ in 0..TRANSITION_INSERT_LIMIT {
            let prose = analysis::strip_markup(&fixed.body);
            if analysis::transition_word_pct(&prose) >= t.transition_word_pct_min {
                break;
            }
            let word = pick(rng, &TRANSITION_POOL);
            match inject_transition(&fixed.body, word) {
                Some(body) => fixed.body = body,
                None => break,
            }
        }

        Ok(fixed)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Title
// ═══════════════════════════════════════════════════════════════════════

const TITLE_SUFFIXES: [&str; 4] = [
    " — A Practical Guide",
    " — What You Need to Know",
    " — Field Notes",
    " — Lessons Learned",
];

const TITLE_VARIANTS: [&str; 3] = ["Revisited", "A Fresh Look", "In Depth"];

pub struct TitleCorrector;

impl Corrector for TitleCorrector {
    fn aspect(&self) -> Aspect {
        Aspect::Title
    }

    fn name(&self) -> &str {
        "title"
    }

    fn description(&self) -> &str {
        "Bring the title into length bounds with the keyword present and unique"
    }

    fn correct(
        &self,
        content: &Content,
        focus_keyword: &str,
        _secondary_keywords: &[String],
        opts: &CorrectionOptions,
        rng: &mut StdRng,
    ) -> Result<Content> {
        let t = &opts.thresholds;
        let min = t.title_min_length;
        let max = t.title_max_length;
        let mut title = content.title.trim().to_string();

        if !focus_keyword.is_empty() && !analysis::contains_keyword(&title, focus_keyword) {
            let keyword = capitalize_first(focus_keyword);
            title = if title.is_empty() {
                format!("The {} Guide", keyword)
            } else {
                format!("{}: {}", keyword, title)
            };
        }

        while title.chars().count() < min {
            title.push_str(pick(rng, &TITLE_SUFFIXES));
        }

        if title.chars().count() > max {
            title = truncate_title(&title, max);
        }

        if opts.detected.contains(&IssueKind::TitleDuplicate) {
            let variant = format!(" ({})", pick(rng, &TITLE_VARIANTS));
            let room = max.saturating_sub(variant.chars().count());
            title = format!("{}{}", truncate_title(&title, room), variant);
        }

        let mut fixed = content.clone();
        fixed.title = title;
        Ok(fixed)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Images
// ═══════════════════════════════════════════════════════════════════════

const IMAGE_PROMPT_TEMPLATES: [&str; 3] = [
    "A clean editorial illustration about {keyword}",
    "A detailed diagram explaining {keyword}",
    "A photo-style header image themed around {keyword}",
];

pub struct ImageCorrector;

impl Corrector for ImageCorrector {
    fn aspect(&self) -> Aspect {
        Aspect::Images
    }

    fn name(&self) -> &str {
        "images"
    }

    fn description(&self) -> &str {
        "Fill in missing images and alt text, keep the keyword represented"
    }

    fn correct(
        &self,
        content: &Content,
        focus_keyword: &str,
        _secondary_keywords: &[String],
        opts: &CorrectionOptions,
        rng: &mut StdRng,
    ) -> Result<Content> {
        let t = &opts.thresholds;
        let mut fixed = content.clone();

        while fixed.image_prompts.len() < t.min_image_count {
            let prompt = pick(rng, &IMAGE_PROMPT_TEMPLATES).replace("{keyword}", focus_keyword);
            fixed.image_prompts.push(ImagePrompt {
                alt: format!("illustration of {}", focus_keyword),
                prompt,
            });
        }

        for img in fixed.image_prompts.iter_mut() {
            if img.alt.trim().is_empty() {
                img.alt = if img.prompt.trim().is_empty() {
                    format!("{} illustration", focus_keyword)
                } else {
                    img.prompt.to_lowercase()
                };
            }
        }

        if !focus_keyword.is_empty()
            && !fixed
                .image_prompts
                .iter()
                .any(|img| analysis::contains_keyword(&img.alt, focus_keyword))
        {
            if let Some(first) = fixed.image_prompts.first_mut() {
                first.alt = format!("{}, featuring {}", first.alt, focus_keyword);
            }
        }

        Ok(fixed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThresholdsConfig;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn opts() -> CorrectionOptions {
        CorrectionOptions::new(ThresholdsConfig::default())
    }

    fn base_content() -> Content {
        Content {
            title: "Rust Performance Tips for Faster Builds".to_string(),
            body: "Rust is fast. However, habits matter. Also, measure first.".to_string(),
            meta_description: "Too short.".to_string(),
            excerpt: String::new(),
            primary_keyword: "rust".to_string(),
            secondary_keywords: vec![],
            image_prompts: vec![ImagePrompt {
                prompt: "a crab".to_string(),
                alt: "rust mascot".to_string(),
            }],
            internal_links: vec![],
            external_links: vec![],
        }
    }

    #[test]
    fn test_meta_corrector_reaches_bounds_with_keyword() {
        let fixed = MetaDescriptionCorrector
            .correct(&base_content(), "rust", &[], &opts(), &mut rng())
            .unwrap();
        let len = fixed.meta_description.chars().count();
        assert!((120..=156).contains(&len), "len was {}", len);
        assert!(analysis::contains_keyword(&fixed.meta_description, "rust"));
    }

    #[test]
    fn test_meta_corrector_trims_overlong_description() {
        let mut content = base_content();
        content.meta_description = format!("All about rust. {}", "Filler sentence here. ".repeat(20));
        let fixed = MetaDescriptionCorrector
            .correct(&content, "rust", &[], &opts(), &mut rng())
            .unwrap();
        let len = fixed.meta_description.chars().count();
        assert!(len <= 156, "len was {}", len);
        assert!(analysis::contains_keyword(&fixed.meta_description, "rust"));
    }

    #[test]
    fn test_density_corrector_raises_low_density() {
        let mut content = base_content();
        // ~0.1% density: one mention across a long keyword-free body.
        content.body = format!("rust matters. {}", "Plain filler words keep coming here. ".repeat(30));
        let fixed = KeywordDensityCorrector
            .correct(&content, "rust", &[], &opts(), &mut rng())
            .unwrap();
        let density =
            analysis::keyword_density(&analysis::strip_markup(&fixed.body), "rust");
        assert!(density >= 0.5, "density was {:.2}", density);
        assert!(density <= 2.5, "density was {:.2}", density);
    }

    #[test]
    fn test_density_corrector_lowers_stuffed_density() {
        let mut content = base_content();
        content.body = "rust rust rust everywhere. rust is rust and rust again. More rust here with rust on top.".to_string();
        let fixed = KeywordDensityCorrector
            .correct(&content, "rust", &["cargo".to_string()], &opts(), &mut rng())
            .unwrap();
        let density =
            analysis::keyword_density(&analysis::strip_markup(&fixed.body), "rust");
        assert!(density < 25.0);
        assert!(analysis::contains_keyword(&fixed.body, "cargo"));
    }

    #[test]
    fn test_density_corrector_seeds_first_paragraph() {
        let mut content = base_content();
        content.body = "No keyword in the opening here.\n\nrust shows up later though, with rust again.".to_string();
        let fixed = KeywordDensityCorrector
            .correct(&content, "rust", &[], &opts(), &mut rng())
            .unwrap();
        let first = analysis::first_paragraph(&fixed.body);
        assert!(analysis::contains_keyword(&first, "rust"));
    }

    #[test]
    fn test_readability_corrector_splits_long_sentences() {
        let mut content = base_content();
        content.body = "This opening sentence keeps going with many words, piling clause upon clause until nobody could possibly follow the point being made at all here.".to_string();
        let fixed = ReadabilityCorrector
            .correct(&content, "rust", &[], &opts(), &mut rng())
            .unwrap();
        let prose = analysis::strip_markup(&fixed.body);
        assert_eq!(analysis::long_sentence_pct(&prose, 20), 0.0);
    }

    #[test]
    fn test_readability_corrector_raises_transition_pct() {
        let mut content = base_content();
        content.body = "The build runs. The tests pass. The cache warms. The deploy ships. The team rests.".to_string();
        let fixed = ReadabilityCorrector
            .correct(&content, "rust", &[], &opts(), &mut rng())
            .unwrap();
        let prose = analysis::strip_markup(&fixed.body);
        assert!(analysis::transition_word_pct(&prose) >= 30.0);
    }

    #[test]
    fn test_readability_corrector_splits_long_paragraphs() {
        let mut content = base_content();
        let sentence = "Ten words sit inside this single filler sentence right here. ";
        content.body = sentence.repeat(20).trim_end().to_string();
        let fixed = ReadabilityCorrector
            .correct(&content, "rust", &[], &opts(), &mut rng())
            .unwrap();
        let longest = analysis::paragraphs(&fixed.body)
            .iter()
            .map(|p| analysis::word_count(p))
            .max()
            .unwrap_or(0);
        assert!(longest <= 150, "longest paragraph was {} words", longest);
    }

    #[test]
    fn test_title_corrector_adds_keyword_and_clamps_length() {
        let mut content = base_content();
        content.title = "Shipping Faster".to_string();
        let fixed = TitleCorrector
            .correct(&content, "rust", &[], &opts(), &mut rng())
            .unwrap();
        let len = fixed.title.chars().count();
        assert!((30..=60).contains(&len), "title was {:?} ({len})", fixed.title);
        assert!(analysis::contains_keyword(&fixed.title, "rust"));
    }

    #[test]
    fn test_title_corrector_differentiates_duplicates() {
        let content = base_content();
        let opts = opts().with_detected(vec![IssueKind::TitleDuplicate]);
        let fixed = TitleCorrector
            .correct(&content, "rust", &[], &opts, &mut rng())
            .unwrap();
        assert_ne!(fixed.title, content.title);
        assert!(fixed.title.chars().count() <= 60);
        assert!(analysis::contains_keyword(&fixed.title, "rust"));
    }

    #[test]
    fn test_image_corrector_fills_missing_images_and_alts() {
        let mut content = base_content();
        content.image_prompts.clear();
        let fixed = ImageCorrector
            .correct(&content, "rust", &[], &opts(), &mut rng())
            .unwrap();
        assert_eq!(fixed.image_prompts.len(), 1);
        assert!(!fixed.image_prompts[0].alt.is_empty());
        assert!(fixed
            .image_prompts
            .iter()
            .any(|img| analysis::contains_keyword(&img.alt, "rust")));
    }

    #[test]
    fn test_image_corrector_backfills_empty_alt_from_prompt() {
        let mut content = base_content();
        content.image_prompts = vec![ImagePrompt {
            prompt: "A rust crab at sunrise".to_string(),
            alt: String::new(),
        }];
        let fixed = ImageCorrector
            .correct(&content, "rust", &[], &opts(), &mut rng())
            .unwrap();
        assert_eq!(fixed.image_prompts[0].alt, "a rust crab at sunrise");
    }

    #[test]
    fn test_corrections_are_reproducible_per_seed() {
        let content = base_content();
        let a = MetaDescriptionCorrector
            .correct(&content, "rust", &[], &opts(), &mut StdRng::seed_from_u64(7))
            .unwrap();
        let b = MetaDescriptionCorrector
            .correct(&content, "rust", &[], &opts(), &mut StdRng::seed_from_u64(7))
            .unwrap();
        assert_eq!(a, b);
    }
}

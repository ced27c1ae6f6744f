//! Rule-based compression of behavior text for lower prompt tiers.

use crate::model::{Behavior, BehaviorKind};

const FILLERS: &[&str] = &[
    "please ",
    "make sure to ",
    "remember to ",
    "when possible, ",
    "in general, ",
    "the following ",
];

const PHRASE_REPLACEMENTS: &[(&str, &str)] = &[
    ("instead of", ">"),
    ("for example", "e.g."),
    ("documentation", "docs"),
];

const CLAUSE_BREAKS: &[&str] = &[
    ". ", ", ", "; ", " - ", " — ", " because ", " since ", " when ", " if ",
];

#[derive(Debug, Clone, Copy)]
pub struct SummarizerConfig {
    pub max_length: usize,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self { max_length: 60 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Summarizer {
    pub config: SummarizerConfig,
}

impl Summarizer {
    pub fn new(config: SummarizerConfig) -> Self {
        Self { config }
    }

    pub fn summarize(&self, behavior: &Behavior) -> String {
        if let Some(stored) = &behavior.content.summary {
            if stored.chars().count() <= self.config.max_length {
                return stored.clone();
            }
        }

        let mut text = behavior.content.canonical.clone();
        text = strip_fillers(&text);
        text = extract_key_pattern(&text, behavior.kind);
        text = replace_phrases(&text);
        text = collapse_and_capitalize(&text);
        truncate(&text, self.config.max_length)
    }
}

fn strip_fillers(text: &str) -> String {
    let mut lower = text.to_lowercase();
    let mut result = text.to_string();
    for filler in FILLERS {
        if let Some(pos) = lower.find(filler) {
            result.replace_range(pos..pos + filler.len(), "");
            lower = result.to_lowercase();
        }
    }
    result
}

fn first_clause(text: &str) -> String {
    let lower = text.to_lowercase();
    let mut cut = text.len();
    for brk in CLAUSE_BREAKS {
        if let Some(pos) = lower.find(brk) {
            cut = cut.min(pos);
        }
    }
    text[..cut].to_string()
}

fn extract_key_pattern(text: &str, kind: BehaviorKind) -> String {
    match kind {
        BehaviorKind::Constraint => {
            let clause = first_clause(text);
            let lower = clause.to_lowercase();
            if lower.starts_with("never ") || lower.starts_with("don't ") || lower.starts_with("do not ") {
                clause
            } else {
                format!("Never {}", lower_first_word_trimmed(&clause))
            }
        }
        BehaviorKind::Preference => {
            let lower = text.to_lowercase();
            if let Some(pos) = lower.find("prefer ") {
                if let Some(over_pos) = lower[pos..].find(" over ") {
                    let x_start = pos + "prefer ".len();
                    let x_end = pos + over_pos;
                    let y_start = pos + over_pos + " over ".len();
                    let y = first_clause(&text[y_start..]);
                    return format!("{} > {}", &text[x_start..x_end], y.trim());
                }
            }
            if let Some(pos) = lower.find("use ") {
                if let Some(instead_pos) = lower[pos..].find(" instead of ") {
                    let x_start = pos + "use ".len();
                    let x_end = pos + instead_pos;
                    let y_start = pos + instead_pos + " instead of ".len();
                    let y = first_clause(&text[y_start..]);
                    return format!("{} > {}", &text[x_start..x_end], y.trim());
                }
            }
            first_clause(text)
        }
        BehaviorKind::Directive => first_clause(text),
        BehaviorKind::Procedure => first_clause(text),
    }
}

fn lower_first_word_trimmed(clause: &str) -> String {
    clause.trim().to_string()
}

fn replace_phrases(text: &str) -> String {
    let mut result = text.to_string();
    for (from, to) in PHRASE_REPLACEMENTS {
        let title = title_case(from);
        result = result.replace(from, to);
        result = result.replace(&title, to);
    }
    result
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn collapse_and_capitalize(text: &str) -> String {
    let collapsed: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => collapsed,
    }
}

fn truncate(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }
    let min_cut = (max_length as f64 * 0.5) as usize;
    let bytes_to_max: String = text.chars().take(max_length).collect();
    let mut cut = bytes_to_max.len();
    if let Some(space_pos) = bytes_to_max.rfind(' ') {
        if space_pos >= min_cut {
            cut = space_pos;
        }
    }
    format!("{}…", &text[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn behavior(kind: BehaviorKind, canonical: &str) -> Behavior {
        Behavior::new("b1", "b1", kind, canonical)
    }

    #[test]
    fn prefers_stored_summary_when_short_enough() {
        let mut b = behavior(BehaviorKind::Directive, "Some long canonical text that would otherwise be compressed");
        b.content.summary = Some("Short summary".to_string());
        let s = Summarizer::default();
        assert_eq!(s.summarize(&b), "Short summary");
    }

    #[test]
    fn strips_filler_phrases() {
        let b = behavior(BehaviorKind::Directive, "Please make sure to use context.Context everywhere");
        let s = Summarizer::default();
        let result = s.summarize(&b);
        assert!(!result.to_lowercase().contains("please"));
    }

    #[test]
    fn truncates_on_word_boundary() {
        let b = behavior(
            BehaviorKind::Directive,
            "This is a very long directive text that definitely exceeds the sixty character default maximum length limit by quite a lot",
        );
        let s = Summarizer::new(SummarizerConfig { max_length: 30 });
        let result = s.summarize(&b);
        assert!(result.ends_with('…'));
        assert!(result.chars().count() <= 31);
    }

    #[test]
    fn preference_extracts_x_over_y() {
        let b = behavior(BehaviorKind::Preference, "I prefer tabs over spaces in this codebase");
        let s = Summarizer::default();
        let result = s.summarize(&b);
        assert!(result.contains('>'));
    }
}

//! Small text helpers shared by the pipeline stages.

/// Tokens that open a casual greeting.
const GREETING_TOKENS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "hiya",
    "howdy",
    "greetings",
    "yo",
    "good morning",
    "good afternoon",
    "good evening",
];

/// Greetings are short: anything longer is treated as a real question.
const GREETING_MAX_WORDS: usize = 4;

/// Lowercase and collapse internal whitespace.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Lowercased words with surrounding punctuation removed.
pub fn words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

/// Lowercased alphanumeric runs: hyphens, slashes and other punctuation
/// all separate terms, so "peanut-butter" yields "peanut" and "butter".
pub fn terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Whether `text` opens with a greeting token.
pub fn starts_with_greeting(text: &str) -> bool {
    let words = words(text);
    let joined = words.join(" ");
    GREETING_TOKENS.iter().any(|token| {
        joined == *token
            || joined
                .strip_prefix(token)
                .is_some_and(|rest| rest.starts_with(' '))
    })
}

/// A bare greeting: greeting prefix and at most four words.
pub fn is_greeting(text: &str) -> bool {
    starts_with_greeting(text) && word_count(text) <= GREETING_MAX_WORDS
}

/// Split into sentences at `.`, `!`, `?` followed by whitespace, and at
/// line breaks. Terminators stay with their sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    sentence_lines(text).into_iter().flatten().collect()
}

/// Sentences grouped by the non-empty line they came from.
pub fn sentence_lines(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .map(split_line)
        .filter(|line| !line.is_empty())
        .collect()
}

fn split_line(line: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        current.push(c);
        let at_boundary = matches!(c, '.' | '!' | '?')
            && chars.peek().is_none_or(|next| next.is_whitespace());
        if at_boundary {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
    sentences
}

/// Truncate to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Whether `haystack` contains `term` as a whole word or phrase, also
/// matching the simple plural/singular counterpart.
pub fn mentions_term(haystack: &str, term: &str) -> bool {
    let term = normalize(term);
    if term.is_empty() {
        return false;
    }
    let hay = format!(" {} ", terms(haystack).join(" "));
    variants(&term)
        .iter()
        .any(|v| hay.contains(&format!(" {v} ")))
}

fn variants(term: &str) -> Vec<String> {
    let base = terms(term).join(" ");
    let mut out = vec![base.clone()];
    if let Some(stem) = base.strip_suffix("ies") {
        out.push(format!("{stem}y"));
    } else if let Some(stem) = base.strip_suffix("es") {
        out.push(stem.to_string());
        out.push(format!("{stem}e"));
    } else if let Some(stem) = base.strip_suffix('s') {
        out.push(stem.to_string());
    } else {
        out.push(format!("{base}s"));
        out.push(format!("{base}es"));
        if let Some(stem) = base.strip_suffix('y') {
            out.push(format!("{stem}ies"));
        }
    }
    out.retain(|v| !v.is_empty());
    out
}

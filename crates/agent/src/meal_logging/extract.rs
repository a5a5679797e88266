//! Meal-name extraction from the user's own words, and candidate recovery
//! from the assistant's previous reply for referential turns.

use std::sync::LazyLock;

use regex_lite::Regex;

use super::macros::{MACRO_MENTION, StatedMacros, food_keyword_hits};
use crate::text::words;

/// Words that name no particular food.
const FILLER: &[&str] = &[
    "something", "anything", "it", "that", "this", "those", "these", "again", "food", "foods",
    "stuff", "thing", "things", "meal", "meals", "breakfast", "lunch", "dinner", "snack",
    "snacks", "one", "more", "option", "options", "idea", "ideas", "portion", "portions",
    "amount", "bit", "same", "usual", "earlier", "today",
];

/// Words that mark a consumption-shaped sentence as being about something
/// other than food ("I had surgery", "I had nausea").
const NON_FOOD: &[&str] = &[
    "surgery", "operation", "procedure", "sleeve", "bypass", "band", "pain", "nausea", "vomiting",
    "reflux", "heartburn", "dumping", "cramps", "cramping", "headache", "diarrhea",
    "constipation", "appointment", "doctor", "surgeon", "dietitian", "checkup", "labs", "question",
    "questions", "problem", "problems", "trouble", "issue", "issues", "weight", "day", "night",
    "time", "week", "workout", "walk", "sleep",
];

/// Glue words ignored when deciding whether a name is pure filler.
const GLUE: &[&str] = &["a", "an", "the", "some", "of", "and", "with", "my", "for", "to"];

/// Leading words stripped from a meal phrase, repeatedly.
const LEADING_NOISE: &[&str] = &[
    "a", "an", "the", "some", "my", "please", "just", "also", "about", "around", "roughly",
    "approximately", "half", "small", "large", "medium", "big", "little", "few", "couple",
    "handful", "cup", "cups", "bowl", "bowls", "plate", "plates", "glass", "glasses", "serving",
    "servings", "slice", "slices", "piece", "pieces", "scoop", "scoops", "spoonful", "spoonfuls",
    "tablespoon", "tablespoons", "tbsp", "teaspoon", "tsp", "oz", "ounce", "ounces", "gram",
    "grams", "bit", "of", "breakfast", "lunch", "dinner", "snack", "meal", "to", "log", "record",
    "that", "i", "had", "ate",
];

const TRAILING_NOISE: &[&str] = &["please", "thanks", "thank", "you", "now", "too", "as", "well"];

/// Cut points that end the food phrase.
static PHRASE_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)[,;(\[.!?]|\s[-–—]\s|\s(?:for|at|this|today|tonight|yesterday|earlier|just|and\s+it|which|that\s+had|with\s+about|to\s+my|into\s+my|in\s+my)\b",
    )
    .unwrap_or_else(|err| panic!("invalid phrase-end regex: {err}"))
});

/// Verb that introduces the food in first-person statements and directives.
static LEAD_IN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:ate|had|have\s+had|drank|drunk|finished|consumed|eaten|log|record|add|save|track)\b\s*:?\s*",
    )
    .unwrap_or_else(|err| panic!("invalid lead-in regex: {err}"))
});

static BULLET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*•+]|\d+[.)])\s+(.+)$")
        .unwrap_or_else(|err| panic!("invalid bullet regex: {err}"))
});

static SUGGESTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:try|consider|recommend|suggest|how\s+about|what\s+about|you\s+could\s+have|you\s+might\s+enjoy|opt\s+for|go\s+with)\b\s*:?\s*([^.!?\n]+)",
    )
    .unwrap_or_else(|err| panic!("invalid suggestion regex: {err}"))
});

/// Numbers and units at the start of a phrase ("2 eggs", "6 oz salmon").
static LEADING_QUANTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\d+(?:[./]\d+)?\s*(?:g|oz|ml|x)?\b\s*")
        .unwrap_or_else(|err| panic!("invalid quantity regex: {err}"))
});

const MAX_NAME_WORDS: usize = 8;

/// A meal recovered from the assistant's previous reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub name: String,
    pub stated: StatedMacros,
    pub score: i32,
}

impl Candidate {
    /// A concrete food proposal: named foods or explicit macros.
    pub fn is_concrete(&self) -> bool {
        food_keyword_hits(&self.name) > 0 || self.stated.any()
    }
}

/// A short canonical meal name from the user's text, or `None` if the
/// text names no particular food.
pub fn extract_meal_name(text: &str) -> Option<String> {
    let after_verb = match LEAD_IN.find(text) {
        Some(m) => &text[m.end()..],
        None => text,
    };
    let name = clean_food_phrase(after_verb)?;
    (!is_filler(&name)).then_some(name)
}

/// Trim a free-text phrase down to the food it names.
pub fn clean_food_phrase(phrase: &str) -> Option<String> {
    let phrase = phrase.trim();
    let cut = [
        PHRASE_END.find(phrase).map(|m| m.start()),
        MACRO_MENTION.find(phrase).map(|m| m.start()),
    ]
    .into_iter()
    .flatten()
    .min()
    .unwrap_or(phrase.len());
    let phrase = &phrase[..cut];

    let mut tokens: Vec<String> = words(phrase.trim_matches('*'));

    loop {
        let before = tokens.len();
        while tokens
            .first()
            .is_some_and(|t| LEADING_NOISE.contains(&t.as_str()))
        {
            tokens.remove(0);
        }
        if let Some(first) = tokens.first() {
            if LEADING_QUANTITY.is_match(first) && first.chars().any(|c| c.is_ascii_digit()) {
                tokens.remove(0);
            }
        }
        if tokens.len() == before {
            break;
        }
    }
    tokens.truncate(MAX_NAME_WORDS);
    // a macro cut can leave "shake with" behind
    while tokens.last().is_some_and(|t| {
        TRAILING_NOISE.contains(&t.as_str()) || GLUE.contains(&t.as_str())
    }) {
        tokens.pop();
    }

    let name = tokens.join(" ");
    (!name.is_empty()).then_some(name)
}

/// Every word is filler or glue.
pub fn is_filler(name: &str) -> bool {
    words(name)
        .iter()
        .all(|w| FILLER.contains(&w.as_str()) || GLUE.contains(&w.as_str()))
}

/// Names something that is not food and carries no food keyword.
pub fn names_non_food(name: &str) -> bool {
    food_keyword_hits(name) == 0
        && words(name)
            .iter()
            .any(|w| NON_FOOD.contains(&w.as_str()))
}

/// Scan the assistant's reply for proposed meals, best first.
///
/// Bulleted lines and "try/consider/recommend X" phrases are candidates.
/// Food keywords score +3 each, filler words -2 each, stated macros +1.
/// Pure filler is rejected. Ties keep the order of appearance.
pub fn referential_candidates(prior: &str) -> Vec<Candidate> {
    let mut raw: Vec<&str> = Vec::new();
    for line in prior.lines() {
        if let Some(body) = BULLET.captures(line).and_then(|c| c.get(1)) {
            raw.push(body.as_str());
        }
        for caps in SUGGESTION.captures_iter(line) {
            if let Some(body) = caps.get(1) {
                raw.push(body.as_str());
            }
        }
    }

    let mut candidates: Vec<Candidate> = Vec::new();
    for body in raw {
        let stated = StatedMacros::parse(body);
        let Some(name) = clean_food_phrase(strip_label(body)) else {
            continue;
        };
        if is_filler(&name) || candidates.iter().any(|c| c.name == name) {
            continue;
        }
        let filler_words = words(&name)
            .iter()
            .filter(|w| FILLER.contains(&w.as_str()))
            .count() as i32;
        let score = 3 * food_keyword_hits(&name) as i32 - 2 * filler_words
            + i32::from(stated.both().is_some());
        if score < 0 {
            continue;
        }
        candidates.push(Candidate {
            name,
            stated,
            score,
        });
    }

    // sort_by is stable: equal scores keep appearance order
    candidates.sort_by(|a, b| b.score.cmp(&a.score));
    candidates
}

/// The top candidate, if the reply proposed anything at all.
pub fn best_candidate(prior: &str) -> Option<Candidate> {
    referential_candidates(prior).into_iter().next()
}

/// Drop markdown emphasis and a short leading label like "Breakfast:" or
/// "Option 1:".
fn strip_label(body: &str) -> &str {
    let body = body.trim().trim_start_matches("**").trim_start_matches('*');
    match body.split_once(':') {
        Some((label, rest)) if !rest.trim().is_empty() && label.split_whitespace().count() <= 3 => {
            rest.trim_start_matches("**").trim()
        }
        _ => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_from_first_person_statements() {
        assert_eq!(
            extract_meal_name("I had a protein shake, 30g protein, 200 calories").as_deref(),
            Some("protein shake")
        );
        assert_eq!(
            extract_meal_name("I just ate 2 scrambled eggs for breakfast").as_deref(),
            Some("scrambled eggs")
        );
        assert_eq!(
            extract_meal_name("I drank a cup of bone broth this morning").as_deref(),
            Some("bone broth")
        );
        assert_eq!(
            extract_meal_name("Please log my lunch of tuna salad").as_deref(),
            Some("tuna salad")
        );
        assert_eq!(
            extract_meal_name("I had greek yogurt 15g protein 100 kcal").as_deref(),
            Some("greek yogurt")
        );
        assert_eq!(
            extract_meal_name("I had a protein shake with 30g protein and 200 calories")
                .as_deref(),
            Some("protein shake")
        );
        assert_eq!(
            extract_meal_name("I ate cottage cheese and 12g protein").as_deref(),
            Some("cottage cheese")
        );
    }

    #[test]
    fn filler_names_are_rejected() {
        assert!(extract_meal_name("I ate something").is_none());
        assert!(extract_meal_name("I had it again").is_none());
        assert!(extract_meal_name("I had breakfast").is_none());
    }

    #[test]
    fn non_food_subjects_detected() {
        assert!(names_non_food("surgery 3 weeks ago"));
        assert!(names_non_food("a rough night"));
        assert!(!names_non_food("chicken soup"));
        assert!(!names_non_food("soup after my surgery"));
    }

    #[test]
    fn recovers_try_suggestion() {
        let prior = "Great question! Try: grilled chicken with rice (35g protein, 400 kcal). \
                     It is gentle on the pouch.";
        let best = best_candidate(prior).unwrap();
        assert_eq!(best.name, "grilled chicken with rice");
        assert_eq!(best.stated.both(), Some((35.0, 400.0)));
        assert!(best.is_concrete());
    }

    #[test]
    fn bullets_ranked_by_food_keywords() {
        let prior = "Here are some ideas:\n\
                     - Something light again\n\
                     - **Snack:** cottage cheese with berries\n\
                     - Baked salmon with mashed cauliflower";
        let candidates = referential_candidates(prior);
        let names: Vec<_> = candidates.iter().map(|c| c.name.as_str()).collect();
        assert!(!names.iter().any(|n| n.contains("something")));
        assert_eq!(names[0], "cottage cheese with berries");
        assert!(names.contains(&"baked salmon with mashed cauliflower"));
    }

    #[test]
    fn no_proposal_no_candidate() {
        assert!(best_candidate("Stay hydrated and sip slowly throughout the day.").is_none());
        assert!(best_candidate("Try it again tomorrow.").is_none());
    }
}

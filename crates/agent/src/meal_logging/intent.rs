//! Meal-logging intent: an ordered rule table, then an optional
//! single-word language-model classification for turns the rules leave
//! undecided.
//!
//! | # | Rule                  | Intent        |
//! |---|-----------------------|---------------|
//! | 1 | referential directive | `Referential` |
//! | 2 | affirmation + proposal| `Referential` |
//! | 3 | first-person eating   | `Eating`      |
//! | 4 | log directive + food  | `Recording`   |
//!
//! The fallback only sees turns with a consumption or logging hint and
//! can only answer eating, recording or none.

use std::sync::LazyLock;

use bariatric_core::message::Message;
use regex_lite::Regex;
use tracing::{debug, warn};

use super::extract::best_candidate;
use super::macros::{StatedMacros, food_keyword_hits};
use crate::llm::LanguageModel;
use crate::state::MealIntent;
use crate::text::{normalize, word_count};

static REFERENTIAL_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:log|record|add|save|track|note)\s+(?:that|this|it|those|these|the\s+(?:meal|one|suggestion|first\s+one|last\s+one)|what\s+you\s+(?:suggested|recommended))\b|\bi\s+(?:just\s+)?(?:had|ate|made)\s+(?:that|it|this|those)\b",
    )
    .unwrap_or_else(|err| panic!("invalid referential regex: {err}"))
});

static AFFIRMATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:thanks|thank\s+you|thx|ok|okay|yes|yep|yeah|sure|sounds\s+good|great|perfect|will\s+do|got\s+it|awesome|cool|nice)\b",
    )
    .unwrap_or_else(|err| panic!("invalid affirmation regex: {err}"))
});

const AFFIRMATION_MAX_WORDS: usize = 6;

static EATING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bi\s+(?:just\s+|already\s+)?(?:ate|had|drank|finished|consumed)\b|\bi(?:'ve|\s+have)\s+(?:just\s+|already\s+)?(?:had|eaten|drunk|finished)\b",
    )
    .unwrap_or_else(|err| panic!("invalid eating regex: {err}"))
});

/// A directive in imperative position: sentence start, or after a
/// politeness marker ("please", "can you").
static LOG_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:^\s*|[.!?;,:]\s+)(?:(?:please|pls|kindly)\s+|(?:can|could|would|will)\s+you\s+(?:please\s+)?)?(?:log|record|add|save|track)\b",
    )
    .unwrap_or_else(|err| panic!("invalid directive regex: {err}"))
});

static POLITE_REQUEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:please\s+)?(?:can|could|would|will)\s+you\s+(?:please\s+)?(?:log|record|add|save|track|note)\b",
    )
    .unwrap_or_else(|err| panic!("invalid request regex: {err}"))
});

/// "add more protein", "track calories": the object is a nutrient, not a food.
static NUTRIENT_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:my\s+|more\s+|extra\s+|some\s+|enough\s+)?(?:protein|calories|calorie|carbs|fiber|fibre|fat|sugar|water|fluids?|vitamins?|intake)\b",
    )
    .unwrap_or_else(|err| panic!("invalid nutrient regex: {err}"))
});

/// "add X to my oatmeal" is a cooking idea unless the target is a log.
static ADD_INTO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:to|into|in|on)\s+my\s+(?:food\s+|meal\s+|daily\s+)?([a-z]+)")
        .unwrap_or_else(|err| panic!("invalid target regex: {err}"))
});

const LOG_TARGETS: &[&str] = &[
    "log", "logs", "diary", "journal", "tracker", "record", "records", "day", "meals", "intake",
    "profile", "list", "plan",
];

static MEAL_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:breakfast|lunch|dinner|snack|meal)s?\b")
        .unwrap_or_else(|err| panic!("invalid meal-word regex: {err}"))
});

static QUESTION_OPENER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:how|what|why|when|where|which|can|could|should|do|does|is|are)\b")
        .unwrap_or_else(|err| panic!("invalid question regex: {err}"))
});

/// Words that make a turn worth a second opinion when no rule matched.
static HINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:ate|eaten|had|drank|finished|consumed|log|logged|record|track)\b|\bfor\s+(?:breakfast|lunch|dinner)\b",
    )
    .unwrap_or_else(|err| panic!("invalid hint regex: {err}"))
});

const CLASSIFIER_PROMPT: &str = "You classify one message from a bariatric surgery patient. \
Answer with exactly one word:\n\
EATING if the patient says they already ate or drank something specific,\n\
RECORDING if they ask to log or record a specific food,\n\
NONE otherwise.";

/// Result of the rule table alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    Matched(MealIntent),
    /// No rule fired; `hint` says whether the fallback may look at it.
    Undecided { hint: bool },
}

struct Rule {
    name: &'static str,
    intent: MealIntent,
    matches: fn(&str, Option<&str>) -> bool,
}

const RULES: &[Rule] = &[
    Rule {
        name: "referential_directive",
        intent: MealIntent::Referential,
        matches: is_referential_directive,
    },
    Rule {
        name: "affirmation_after_proposal",
        intent: MealIntent::Referential,
        matches: affirms_proposal,
    },
    Rule {
        name: "first_person_eating",
        intent: MealIntent::Eating,
        matches: is_first_person_eating,
    },
    Rule {
        name: "log_directive",
        intent: MealIntent::Recording,
        matches: is_log_directive,
    },
];

fn is_referential_directive(text: &str, _prior: Option<&str>) -> bool {
    let Some(found) = REFERENTIAL_DIRECTIVE.find(text) else {
        return false;
    };
    !asks_a_question(text) && !targets_a_dish(&text[found.end()..])
}

fn is_first_person_eating(text: &str, _prior: Option<&str>) -> bool {
    EATING.is_match(text)
}

fn affirms_proposal(text: &str, prior: Option<&str>) -> bool {
    let normalized = normalize(text);
    if word_count(&normalized) > AFFIRMATION_MAX_WORDS || !AFFIRMATION.is_match(&normalized) {
        return false;
    }
    prior
        .and_then(best_candidate)
        .is_some_and(|candidate| candidate.is_concrete())
}

fn is_log_directive(text: &str, _prior: Option<&str>) -> bool {
    let Some(found) = LOG_DIRECTIVE.find(text) else {
        return false;
    };
    if asks_a_question(text) {
        return false;
    }
    let rest = &text[found.end()..];
    if NUTRIENT_OBJECT.is_match(rest) || targets_a_dish(rest) {
        return false;
    }
    MEAL_WORD.is_match(rest) || food_keyword_hits(rest) > 0 || StatedMacros::parse(rest).any()
}

fn is_question(text: &str) -> bool {
    text.trim_end().ends_with('?') && QUESTION_OPENER.is_match(text)
}

/// A question, unless it is a polite request to log ("can you log that?").
fn asks_a_question(text: &str) -> bool {
    is_question(text) && !POLITE_REQUEST.is_match(text)
}

/// "... to my oatmeal" names a dish to change, not a log to write to.
fn targets_a_dish(rest: &str) -> bool {
    ADD_INTO.captures(rest).is_some_and(|caps| {
        caps.get(1)
            .is_some_and(|target| !LOG_TARGETS.contains(&target.as_str().to_lowercase().as_str()))
    })
}

/// Run the rule table in order; first match wins.
pub fn classify_by_rules(text: &str, prior: Option<&str>) -> RuleOutcome {
    for rule in RULES {
        if (rule.matches)(text, prior) {
            debug!(rule = rule.name, intent = ?rule.intent, "Meal intent rule matched");
            return RuleOutcome::Matched(rule.intent);
        }
    }
    RuleOutcome::Undecided {
        hint: HINT.is_match(text) && !text.trim_end().ends_with('?'),
    }
}

/// Rule table plus the optional language-model fallback.
#[derive(Clone, Default)]
pub struct IntentClassifier {
    fallback: Option<LanguageModel>,
}

impl IntentClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback(mut self, llm: LanguageModel) -> Self {
        self.fallback = Some(llm);
        self
    }

    pub async fn classify(&self, text: &str, prior: Option<&str>) -> MealIntent {
        match classify_by_rules(text, prior) {
            RuleOutcome::Matched(intent) => intent,
            RuleOutcome::Undecided { hint: true } => match &self.fallback {
                Some(llm) => self.ask(llm, text).await,
                None => MealIntent::None,
            },
            RuleOutcome::Undecided { hint: false } => MealIntent::None,
        }
    }

    async fn ask(&self, llm: &LanguageModel, text: &str) -> MealIntent {
        let messages = vec![Message::system(CLASSIFIER_PROMPT), Message::user(text)];
        match llm.complete_text(messages).await {
            Ok(answer) => {
                let intent = parse_label(&answer);
                debug!(?intent, "Meal intent from fallback classifier");
                intent
            }
            Err(err) => {
                warn!(error = %err, "Intent fallback failed, treating turn as no meal");
                MealIntent::None
            }
        }
    }
}

fn parse_label(answer: &str) -> MealIntent {
    let upper = answer.to_uppercase();
    if upper.contains("RECORDING") {
        MealIntent::Recording
    } else if upper.contains("EATING") {
        MealIntent::Eating
    } else {
        MealIntent::None
    }
}

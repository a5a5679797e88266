//! Macro sources: numbers stated in text, and the keyword-bucket estimate
//! used when nothing better is available.

use std::sync::LazyLock;

use regex_lite::Regex;

use crate::text::mentions_term;

/// Foods that are mostly protein. Checked first.
pub const PROTEIN_DENSE: &[&str] = &[
    "chicken", "turkey", "beef", "steak", "pork", "lamb", "ham", "fish", "salmon", "tuna", "cod",
    "tilapia", "shrimp", "prawn", "crab", "tofu", "tempeh", "seitan", "jerky", "meatball",
    "protein shake", "protein bar", "protein powder",
];

pub const DAIRY_EGG: &[&str] = &[
    "egg", "omelet", "omelette", "yogurt", "yoghurt", "cheese", "cottage cheese", "ricotta",
    "milk", "kefir", "custard", "quiche",
];

pub const LIQUID_SOUP: &[&str] = &[
    "soup", "broth", "stock", "bisque", "chowder", "smoothie", "shake", "juice", "tea", "coffee",
    "water", "gelatin", "jello", "popsicle",
];

/// Recognizable foods that fall in the default bucket.
pub const OTHER_FOODS: &[&str] = &[
    "rice", "quinoa", "oatmeal", "oats", "bean", "lentil", "hummus", "avocado", "banana", "apple",
    "applesauce", "berry", "berries", "fruit", "vegetable", "veggies", "broccoli", "spinach",
    "salad", "toast", "bread", "pasta", "noodle", "potato", "sweet potato", "cauliflower",
    "zucchini", "squash", "peanut butter", "peanut", "nut", "almond", "cracker", "wrap",
    "sandwich", "tortilla", "pudding", "chili", "stew", "casserole", "pizza", "burrito", "taco",
];

#[derive(Debug, Clone, Copy, PartialEq)]
struct Bucket {
    protein: f64,
    calories: f64,
}

const PROTEIN_DENSE_ESTIMATE: Bucket = Bucket {
    protein: 40.0,
    calories: 300.0,
};
const DAIRY_EGG_ESTIMATE: Bucket = Bucket {
    protein: 20.0,
    calories: 200.0,
};
const LIQUID_ESTIMATE: Bucket = Bucket {
    protein: 8.0,
    calories: 100.0,
};
const DEFAULT_ESTIMATE: Bucket = Bucket {
    protein: 15.0,
    calories: 200.0,
};

/// Rough `(protein_g, calories)` for a meal name.
pub fn heuristic_estimate(meal: &str) -> (f64, f64) {
    let bucket = if contains_any(meal, PROTEIN_DENSE) {
        PROTEIN_DENSE_ESTIMATE
    } else if contains_any(meal, DAIRY_EGG) {
        DAIRY_EGG_ESTIMATE
    } else if contains_any(meal, LIQUID_SOUP) {
        LIQUID_ESTIMATE
    } else {
        DEFAULT_ESTIMATE
    };
    (bucket.protein, bucket.calories)
}

/// Number of distinct food keywords in `text`, across all buckets.
pub fn food_keyword_hits(text: &str) -> usize {
    [PROTEIN_DENSE, DAIRY_EGG, LIQUID_SOUP, OTHER_FOODS]
        .iter()
        .flat_map(|list| list.iter())
        .filter(|kw| mentions_term(text, kw))
        .count()
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| mentions_term(text, kw))
}

static PROTEIN_AFTER_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:g|gm|grams?)\b(?:\s+of)?\s+protein")
        .unwrap_or_else(|err| panic!("invalid protein regex: {err}"))
});

static PROTEIN_BEFORE_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bprotein\s*(?::|=|-|of)?\s*(\d+(?:\.\d+)?)\s*(?:g|gm|grams?)?\b")
        .unwrap_or_else(|err| panic!("invalid protein regex: {err}"))
});

static CALORIES_AFTER_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:kcals?|cals?|calories)\b")
        .unwrap_or_else(|err| panic!("invalid calorie regex: {err}"))
});

static CALORIES_BEFORE_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:calories|kcal)\s*(?::|=|-|of)?\s*(\d+(?:\.\d+)?)\b")
        .unwrap_or_else(|err| panic!("invalid calorie regex: {err}"))
});

/// Matches any macro mention, used to cut meal names.
pub static MACRO_MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\d+(?:\.\d+)?\s*(?:g|gm|grams?|kcals?|cals?|calories)\b|\b(?:protein|calories|kcal)\s*(?::|=)",
    )
    .unwrap_or_else(|err| panic!("invalid macro regex: {err}"))
});

/// Protein and calories written out in a message.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatedMacros {
    pub protein: Option<f64>,
    pub calories: Option<f64>,
}

impl StatedMacros {
    pub fn parse(text: &str) -> Self {
        Self {
            protein: first_number(&[&PROTEIN_AFTER_NUMBER, &PROTEIN_BEFORE_NUMBER], text),
            calories: first_number(&[&CALORIES_AFTER_NUMBER, &CALORIES_BEFORE_NUMBER], text),
        }
    }

    /// Both values, when both are present and positive.
    pub fn both(&self) -> Option<(f64, f64)> {
        match (self.protein, self.calories) {
            (Some(p), Some(c)) if p > 0.0 && c > 0.0 => Some((p, c)),
            _ => None,
        }
    }

    pub fn any(&self) -> bool {
        self.protein.is_some() || self.calories.is_some()
    }

    /// Fill gaps in `self` from `other`.
    pub fn or(self, other: Self) -> Self {
        Self {
            protein: self.protein.or(other.protein),
            calories: self.calories.or(other.calories),
        }
    }
}

fn first_number(patterns: &[&Regex], text: &str) -> Option<f64> {
    patterns.iter().find_map(|re| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stated_macros() {
        let stated = StatedMacros::parse("I had a protein shake, 30g protein, 200 calories");
        assert_eq!(stated.both(), Some((30.0, 200.0)));

        let labelled = StatedMacros::parse("eggs - protein: 12, calories: 140");
        assert_eq!(labelled.both(), Some((12.0, 140.0)));

        let kcal = StatedMacros::parse("grilled chicken with rice (35g protein, 400 kcal)");
        assert_eq!(kcal.both(), Some((35.0, 400.0)));
    }

    #[test]
    fn partial_or_zero_is_not_both() {
        let only_protein = StatedMacros::parse("a shake with 25 grams of protein");
        assert_eq!(only_protein.protein, Some(25.0));
        assert!(only_protein.both().is_none());

        let zero = StatedMacros::parse("water, 0g protein, 0 calories");
        assert!(zero.both().is_none());
    }

    #[test]
    fn protein_shake_is_not_a_number() {
        let stated = StatedMacros::parse("I had a protein shake");
        assert!(!stated.any());
    }

    #[test]
    fn heuristic_buckets() {
        assert_eq!(heuristic_estimate("grilled chicken with rice"), (40.0, 300.0));
        assert_eq!(heuristic_estimate("scrambled eggs"), (20.0, 200.0));
        assert_eq!(heuristic_estimate("chicken broth"), (40.0, 300.0));
        assert_eq!(heuristic_estimate("bone broth"), (8.0, 100.0));
        assert_eq!(heuristic_estimate("mashed cauliflower"), (15.0, 200.0));
    }

    #[test]
    fn keyword_hits_count_distinct_foods() {
        assert_eq!(food_keyword_hits("grilled chicken with rice"), 2);
        assert_eq!(food_keyword_hits("something again"), 0);
    }
}

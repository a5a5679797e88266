//! Phase of care derived from the surgery date.

use chrono::{NaiveDate, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseOfCare {
    PreOperative,
    ClearLiquids { week: u32 },
    FullLiquids { week: u32 },
    PureedSoft { week: u32 },
    Regular { week: u32 },
}

impl PhaseOfCare {
    /// Phase for a `YYYY-MM-DD` surgery date relative to `today`.
    /// `None` when the date does not parse.
    pub fn from_surgery_date(surgery_date: &str, today: NaiveDate) -> Option<Self> {
        let date = NaiveDate::parse_from_str(surgery_date.trim(), "%Y-%m-%d").ok()?;
        let days = (today - date).num_days();
        if days < 0 {
            return Some(Self::PreOperative);
        }
        let week = u32::try_from(days / 7 + 1).unwrap_or(u32::MAX);
        Some(match week {
            1 => Self::ClearLiquids { week },
            2 => Self::FullLiquids { week },
            3..=6 => Self::PureedSoft { week },
            _ => Self::Regular { week },
        })
    }

    /// Phase as of today (UTC).
    pub fn current(surgery_date: &str) -> Option<Self> {
        Self::from_surgery_date(surgery_date, Utc::now().date_naive())
    }

    /// e.g. `Phase 3: Pureed/Soft Foods, Week 3`
    pub fn label(&self) -> String {
        match self {
            Self::PreOperative => "Pre-operative".into(),
            Self::ClearLiquids { week } => format!("Phase 1: Clear Liquids, Week {week}"),
            Self::FullLiquids { week } => format!("Phase 2: Full Liquids, Week {week}"),
            Self::PureedSoft { week } => format!("Phase 3: Pureed/Soft Foods, Week {week}"),
            Self::Regular { week } => format!("Phase 4: Regular Textured Foods, Week {week}"),
        }
    }

    /// What the patient may eat in this phase.
    pub fn diet_rule(&self) -> &'static str {
        match self {
            Self::PreOperative => {
                "Pre-operative: follow the pre-surgery liquid diet the care team prescribed."
            }
            Self::ClearLiquids { .. } => {
                "Clear liquids only (water, broth, sugar-free gelatin); no solid food."
            }
            Self::FullLiquids { .. } => {
                "Full liquids only (protein shakes, thin yogurt, strained soups); no solid food."
            }
            Self::PureedSoft { .. } => {
                "Pureed and soft foods only (eggs, cottage cheese, flaked fish, mashed beans); \
                 no raw vegetables, bread, rice, or tough meats."
            }
            Self::Regular { .. } => {
                "Regular textured foods in small portions; protein first, chew thoroughly."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn phase_boundaries() {
        let surgery = "2026-03-01";
        let phase = |today| PhaseOfCare::from_surgery_date(surgery, day(today)).unwrap();

        assert_eq!(phase("2026-02-20"), PhaseOfCare::PreOperative);
        assert_eq!(phase("2026-03-01"), PhaseOfCare::ClearLiquids { week: 1 });
        assert_eq!(phase("2026-03-07"), PhaseOfCare::ClearLiquids { week: 1 });
        assert_eq!(phase("2026-03-08"), PhaseOfCare::FullLiquids { week: 2 });
        assert_eq!(phase("2026-03-15"), PhaseOfCare::PureedSoft { week: 3 });
        assert_eq!(phase("2026-04-11"), PhaseOfCare::PureedSoft { week: 6 });
        assert_eq!(phase("2026-04-12"), PhaseOfCare::Regular { week: 7 });
    }

    #[test]
    fn label_format() {
        assert_eq!(
            PhaseOfCare::PureedSoft { week: 3 }.label(),
            "Phase 3: Pureed/Soft Foods, Week 3"
        );
        assert_eq!(PhaseOfCare::PreOperative.label(), "Pre-operative");
    }

    #[test]
    fn unparseable_date_is_unknown() {
        assert!(PhaseOfCare::from_surgery_date("last spring", day("2026-01-01")).is_none());
        assert!(PhaseOfCare::current("").is_none());
    }
}

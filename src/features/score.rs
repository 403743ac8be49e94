//! Score string parsing
//!
//! Extracts tiebreak counts from final scores such as `6-4 7-6(3) 6-2`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::TiebreakAttribution;

/// Trailing tiebreak points, e.g. the `(3)` in `7-6(3)`
static PAREN_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(.*\)$").unwrap());

/// A plain set score once the suffix is gone
static SET_SCORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+-\d+$").unwrap());

/// Tiebreaks found in one match score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TiebreakCount {
    pub played: u32,
    pub won_by_winner: u32,
    pub won_by_loser: u32,
}

/// Parsed view of a final score
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreSummary {
    /// Set tokens with the tiebreak suffix stripped
    pub sets: Vec<String>,
    /// Tokens that are not set scores (`RET`, `W/O`, garbage)
    pub other_tokens: usize,
}

impl ScoreSummary {
    pub fn parse(score: &str) -> Self {
        let mut summary = ScoreSummary::default();
        for token in score.split_whitespace() {
            let stripped = PAREN_SUFFIX.replace(token, "");
            if SET_SCORE.is_match(&stripped) {
                summary.sets.push(stripped.into_owned());
            } else {
                summary.other_tokens += 1;
            }
        }
        summary
    }

    /// No set score could be read at all
    pub fn is_malformed(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn tiebreaks(&self, attribution: TiebreakAttribution) -> TiebreakCount {
        let mut count = TiebreakCount::default();
        for set in &self.sets {
            match set.as_str() {
                "7-6" => {
                    count.played += 1;
                    count.won_by_winner += 1;
                }
                "6-7" => {
                    count.played += 1;
                    match attribution {
                        TiebreakAttribution::WinnerAll => count.won_by_winner += 1,
                        TiebreakAttribution::SetWinner => count.won_by_loser += 1,
                    }
                }
                _ => {}
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_tiebreaks(score: &str, attribution: TiebreakAttribution) -> TiebreakCount {
        ScoreSummary::parse(score).tiebreaks(attribution)
    }

    #[test]
    fn test_single_tiebreak_won_by_winner() {
        let count = count_tiebreaks("6-4 7-6(3) 6-2", TiebreakAttribution::WinnerAll);
        assert_eq!(count.played, 1);
        assert_eq!(count.won_by_winner, 1);
        assert_eq!(count.won_by_loser, 0);
    }

    #[test]
    fn test_six_seven_set_credited_to_winner() {
        let count = count_tiebreaks("3-6 6-7(5) 2-6", TiebreakAttribution::WinnerAll);
        assert_eq!(count.played, 1);
        assert_eq!(count.won_by_winner, 1);
        assert_eq!(count.won_by_loser, 0);
    }

    #[test]
    fn test_set_winner_attribution() {
        let count = count_tiebreaks("7-6(4) 6-7(8) 7-6(10)", TiebreakAttribution::SetWinner);
        assert_eq!(count.played, 3);
        assert_eq!(count.won_by_winner, 2);
        assert_eq!(count.won_by_loser, 1);
    }

    #[test]
    fn test_tiebreak_without_points_suffix() {
        let count = count_tiebreaks("7-6 7-6", TiebreakAttribution::WinnerAll);
        assert_eq!(count.played, 2);
        assert_eq!(count.won_by_winner, 2);
    }

    #[test]
    fn test_empty_scores() {
        assert_eq!(
            count_tiebreaks("", TiebreakAttribution::WinnerAll),
            TiebreakCount::default()
        );
        assert_eq!(
            count_tiebreaks("   ", TiebreakAttribution::WinnerAll),
            TiebreakCount::default()
        );
    }

    #[test]
    fn test_malformed_score() {
        let summary = ScoreSummary::parse("W/O");
        assert!(summary.is_malformed());
        assert_eq!(summary.other_tokens, 1);
        assert_eq!(
            summary.tiebreaks(TiebreakAttribution::WinnerAll),
            TiebreakCount::default()
        );

        let summary = ScoreSummary::parse("not a score");
        assert!(summary.is_malformed());
    }

    #[test]
    fn test_retirement_keeps_completed_sets() {
        let summary = ScoreSummary::parse("7-6(2) 3-1 RET");
        assert!(!summary.is_malformed());
        assert_eq!(summary.sets, vec!["7-6".to_string(), "3-1".to_string()]);
        assert_eq!(summary.other_tokens, 1);
        assert_eq!(summary.tiebreaks(TiebreakAttribution::WinnerAll).played, 1);
    }

    #[test]
    fn test_only_exact_tiebreak_sets_count() {
        // 17-6 and 7-65 contain "7-6" but are not tiebreak sets
        let count = count_tiebreaks("17-6 7-65 6-4", TiebreakAttribution::WinnerAll);
        assert_eq!(count.played, 0);
    }
}

//! Chronological ordering of match records

use crate::MatchRecord;

/// Processing order for `records`: indices sorted by (date, match number).
///
/// The sort is stable, so records sharing both keys keep their input order
/// and the result is identical from run to run.
pub fn sequence(records: &[MatchRecord]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by(|&a, &b| {
        let (ra, rb) = (&records[a], &records[b]);
        ra.date
            .cmp(&rb.date)
            .then(ra.match_number.cmp(&rb.match_number))
    });

    let displaced = order.iter().enumerate().filter(|(pos, idx)| pos != *idx).count();
    if displaced > 0 {
        log::debug!(
            "Re-sorted input: {} of {} records moved to chronological position",
            displaced,
            records.len()
        );
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_match(y: i32, m: u32, d: u32, number: i64, winner: &str) -> MatchRecord {
        MatchRecord::new(
            NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            number,
            winner,
            "Opponent",
        )
    }

    #[test]
    fn test_orders_by_date_then_match_number() {
        let records = vec![
            make_match(2020, 3, 1, 1, "C"),
            make_match(2020, 1, 1, 2, "B"),
            make_match(2020, 1, 1, 1, "A"),
        ];
        assert_eq!(sequence(&records), vec![2, 1, 0]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let records = vec![
            make_match(2021, 5, 10, 7, "First"),
            make_match(2021, 5, 10, 7, "Second"),
            make_match(2021, 5, 10, 7, "Third"),
        ];
        assert_eq!(sequence(&records), vec![0, 1, 2]);
    }

    #[test]
    fn test_deterministic_across_runs() {
        let records: Vec<MatchRecord> = (0..50)
            .map(|i| make_match(2019 + (i % 3) as i32, 1 + (i % 12) as u32, 1, (i * 7 % 5) as i64, "P"))
            .collect();
        assert_eq!(sequence(&records), sequence(&records));
    }

    #[test]
    fn test_empty_input() {
        assert!(sequence(&[]).is_empty());
    }
}

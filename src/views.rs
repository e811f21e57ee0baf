use crate::models::{ApplicationRecord, Status};

/// Records matching both the status filter and the search term, in their
/// original order. An empty term or a `None` status places no constraint.
/// The term is matched as typed, surrounding whitespace included.
pub fn filter<'a>(
    records: &'a [ApplicationRecord],
    search: &str,
    status: Option<&Status>,
) -> Vec<&'a ApplicationRecord> {
    let needle = search.to_lowercase();
    records
        .iter()
        .filter(|r| status.is_none_or(|s| &r.status == s))
        .filter(|r| needle.is_empty() || matches_search(r, &needle))
        .collect()
}

fn matches_search(record: &ApplicationRecord, needle: &str) -> bool {
    record.company.to_lowercase().contains(needle)
        || record.title.to_lowercase().contains(needle)
        || record
            .notes
            .as_deref()
            .is_some_and(|notes| notes.to_lowercase().contains(needle))
}

/// Per-status tally in enumeration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCounts([(Status, usize); 5]);

impl StatusCounts {
    pub fn get(&self, status: &Status) -> usize {
        self.0
            .iter()
            .find(|(s, _)| s == status)
            .map_or(0, |(_, n)| *n)
    }

    pub fn total(&self) -> usize {
        self.0.iter().map(|(_, n)| n).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Status, usize)> {
        self.0.iter().map(|(s, n)| (s, *n))
    }
}

/// Count records per status. Every known status is present, zero or not;
/// unrecognized statuses are skipped.
pub fn counts_by_status<'a, I>(records: I) -> StatusCounts
where
    I: IntoIterator<Item = &'a ApplicationRecord>,
{
    let mut counts = Status::ALL.map(|s| (s, 0));
    for record in records {
        if let Some((_, n)) = counts.iter_mut().find(|(s, _)| *s == record.status) {
            *n += 1;
        }
    }
    StatusCounts(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{sample_applications, ApplicationFields};
    use chrono::NaiveDate;

    fn record(id: i64, status: Status) -> ApplicationRecord {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        ApplicationRecord::from_fields(id, ApplicationFields::new("Co", "Dev", status, date))
    }

    #[test]
    fn test_filter_without_constraints_is_identity() {
        let records = sample_applications();
        let filtered = filter(&records, "", None);
        let expected: Vec<&ApplicationRecord> = records.iter().collect();
        assert_eq!(filtered, expected);
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let records = sample_applications();
        let filtered = filter(&records, "tech", None);
        let companies: Vec<&str> = filtered.iter().map(|r| r.company.as_str()).collect();
        assert_eq!(companies, vec!["Tech Solutions Inc.", "Creative Tech"]);
    }

    #[test]
    fn test_filter_keeps_whitespace_in_term() {
        let records = sample_applications();
        let filtered = filter(&records, "tech ", None);
        let companies: Vec<&str> = filtered.iter().map(|r| r.company.as_str()).collect();
        assert_eq!(companies, vec!["Tech Solutions Inc."]);

        let blank = vec![record(1, Status::Applied)];
        assert!(filter(&blank, "  ", None).is_empty());
    }

    #[test]
    fn test_filter_searches_title_and_notes() {
        let records = sample_applications();
        assert_eq!(filter(&records, "UX DESIGNER", None).len(), 1);
        let by_notes = filter(&records, "offer letter", None);
        assert_eq!(by_notes.len(), 1);
        assert_eq!(by_notes[0].company, "Creative Tech");
    }

    #[test]
    fn test_filter_by_status_and_term() {
        let records = sample_applications();
        assert_eq!(filter(&records, "", Some(&Status::Interview)).len(), 1);
        assert_eq!(filter(&records, "tech", Some(&Status::Offer)).len(), 1);
        assert!(filter(&records, "tech", Some(&Status::Rejected)).is_empty());
    }

    #[test]
    fn test_filter_ignores_missing_notes() {
        let records = vec![record(1, Status::Applied)];
        assert!(filter(&records, "anything", None).is_empty());
    }

    #[test]
    fn test_counts_on_empty() {
        let counts = counts_by_status(&Vec::<ApplicationRecord>::new());
        assert_eq!(counts.total(), 0);
        for status in Status::ALL {
            assert_eq!(counts.get(&status), 0);
        }
        assert_eq!(counts.iter().count(), 5);
    }

    #[test]
    fn test_counts_tally() {
        let records = vec![
            record(1, Status::Interview),
            record(2, Status::Interview),
            record(3, Status::Offer),
        ];
        let counts = counts_by_status(&records);
        let pairs: Vec<(&str, usize)> = counts.iter().map(|(s, n)| (s.label(), n)).collect();
        assert_eq!(
            pairs,
            vec![
                ("Applied", 0),
                ("In Review", 0),
                ("Interview", 2),
                ("Offer", 1),
                ("Rejected", 0),
            ]
        );
    }

    #[test]
    fn test_counts_skip_unrecognized() {
        let records = vec![
            record(1, Status::Unrecognized("Ghosted".to_string())),
            record(2, Status::Applied),
        ];
        let counts = counts_by_status(&records);
        assert_eq!(counts.total(), 1);
        assert_eq!(counts.get(&Status::Unrecognized("Ghosted".to_string())), 0);
    }
}

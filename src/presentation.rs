use chrono::NaiveDate;

use crate::models::{ApplicationRecord, Status};
use crate::views::StatusCounts;

pub const EMPTY_TABLE_MESSAGE: &str =
    "No applications found. Add your first job application above!";

/// Hex colour for a status, shared by the table badges and the chart.
pub fn status_color(status: &Status) -> &'static str {
    match status {
        Status::Applied => "#6c757d",
        Status::InReview => "#4cc9f0",
        Status::Interview => "#ffbe0b",
        Status::Offer => "#4bb543",
        Status::Rejected => "#e63946",
        Status::Unrecognized(_) => "#adb5bd",
    }
}

/// `Feb 15, 2024`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub id: i64,
    pub company: String,
    pub link: Option<String>,
    pub title: String,
    pub status: String,
    pub color: &'static str,
    pub date: String,
}

impl TableRow {
    fn from_record(record: &ApplicationRecord) -> Self {
        Self {
            id: record.id,
            company: record.company.clone(),
            link: record.link.clone(),
            title: record.title.clone(),
            status: record.status.label().to_string(),
            color: status_color(&record.status),
            date: format_date(record.date),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Edit(i64),
    Delete(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Edit,
    Delete,
}

/// The rendered table. Rebuilt from scratch after every change; row
/// actions are resolved against the rows of the latest render only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableView {
    rows: Vec<TableRow>,
}

impl TableView {
    /// Newest first.
    pub fn render<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a ApplicationRecord>,
        I::IntoIter: DoubleEndedIterator,
    {
        Self {
            rows: records.into_iter().rev().map(TableRow::from_record).collect(),
        }
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Bind an action to the record shown at `index`.
    pub fn action(&self, index: usize, kind: ActionKind) -> Option<RowAction> {
        let id = self.rows.get(index)?.id;
        Some(match kind {
            ActionKind::Edit => RowAction::Edit(id),
            ActionKind::Delete => RowAction::Delete(id),
        })
    }

    pub fn position(&self, id: i64) -> Option<usize> {
        self.rows.iter().position(|row| row.id == id)
    }
}

/// What the chart surface needs, in enumeration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartData {
    pub labels: Vec<&'static str>,
    pub values: Vec<u64>,
    pub colors: Vec<&'static str>,
}

impl ChartData {
    pub fn from_counts(counts: &StatusCounts) -> Self {
        let mut data = ChartData {
            labels: Vec::with_capacity(5),
            values: Vec::with_capacity(5),
            colors: Vec::with_capacity(5),
        };
        for (status, count) in counts.iter() {
            data.labels.push(static_label(status));
            data.values.push(count as u64);
            data.colors.push(status_color(status));
        }
        data
    }

    pub fn total(&self) -> u64 {
        self.values.iter().sum()
    }

    /// Whole-number percentage of the total, for tooltips.
    pub fn share(&self, index: usize) -> u64 {
        let total = self.total();
        match self.values.get(index) {
            Some(&value) if total > 0 => ((value as f64 / total as f64) * 100.0).round() as u64,
            _ => 0,
        }
    }
}

fn static_label(status: &Status) -> &'static str {
    match status {
        Status::Applied => "Applied",
        Status::InReview => "In Review",
        Status::Interview => "Interview",
        Status::Offer => "Offer",
        Status::Rejected => "Rejected",
        Status::Unrecognized(_) => "Other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_applications;
    use crate::views::counts_by_status;

    #[test]
    fn test_rows_are_newest_first() {
        let records = sample_applications();
        let table = TableView::render(&records);
        assert_eq!(table.len(), 5);
        assert_eq!(table.rows()[0].company, "Creative Tech");
        assert_eq!(table.rows()[4].company, "Tech Solutions Inc.");
    }

    #[test]
    fn test_row_formatting() {
        let records = sample_applications();
        let table = TableView::render(&records[..1]);
        let row = &table.rows()[0];
        assert_eq!(row.date, "Feb 15, 2024");
        assert_eq!(row.status, "Applied");
        assert_eq!(row.color, "#6c757d");
        assert_eq!(row.link.as_deref(), Some("https://example.com/job1"));
    }

    #[test]
    fn test_actions_follow_latest_render() {
        let mut records = sample_applications();
        let table = TableView::render(&records);
        assert_eq!(table.action(0, ActionKind::Edit), Some(RowAction::Edit(5)));
        assert_eq!(table.action(4, ActionKind::Delete), Some(RowAction::Delete(1)));
        assert_eq!(table.action(5, ActionKind::Edit), None);

        records.pop();
        let table = TableView::render(&records);
        assert_eq!(table.action(0, ActionKind::Delete), Some(RowAction::Delete(4)));
        assert_eq!(table.action(4, ActionKind::Delete), None);
        assert_eq!(table.position(1), Some(3));
    }

    #[test]
    fn test_empty_render() {
        let table = TableView::render(&Vec::<ApplicationRecord>::new());
        assert!(table.is_empty());
    }

    #[test]
    fn test_chart_data() {
        let records = sample_applications();
        let chart = ChartData::from_counts(&counts_by_status(&records));
        assert_eq!(
            chart.labels,
            vec!["Applied", "In Review", "Interview", "Offer", "Rejected"]
        );
        assert_eq!(chart.values, vec![1, 1, 1, 1, 1]);
        assert_eq!(chart.colors[4], "#e63946");
        assert_eq!(chart.share(0), 20);
    }

    #[test]
    fn test_chart_share_with_no_records() {
        let chart = ChartData::from_counts(&counts_by_status(&Vec::<ApplicationRecord>::new()));
        assert_eq!(chart.values, vec![0; 5]);
        assert_eq!(chart.share(2), 0);
    }
}

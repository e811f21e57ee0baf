use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Where an application currently stands.
///
/// The set is closed; anything else that turns up in persisted data is kept
/// verbatim as `Unrecognized` so it survives a save but never counts toward
/// the chart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    Applied,
    InReview,
    Interview,
    Offer,
    Rejected,
    Unrecognized(String),
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Applied,
        Status::InReview,
        Status::Interview,
        Status::Offer,
        Status::Rejected,
    ];

    pub fn label(&self) -> &str {
        match self {
            Status::Applied => "Applied",
            Status::InReview => "In Review",
            Status::Interview => "Interview",
            Status::Offer => "Offer",
            Status::Rejected => "Rejected",
            Status::Unrecognized(raw) => raw,
        }
    }

    /// Parse a label, also accepting lowercase and `in-review` style input
    /// from the command line. Returns `None` for anything outside the set.
    pub fn parse(input: &str) -> Option<Status> {
        let normalized: String = input
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "applied" => Some(Status::Applied),
            "inreview" => Some(Status::InReview),
            "interview" => Some(Status::Interview),
            "offer" => Some(Status::Offer),
            "rejected" => Some(Status::Rejected),
            _ => None,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Status::Unrecognized(_))
    }

    /// Next status in enumeration order, wrapping around. Used by the form.
    pub fn next(&self) -> Status {
        let idx = Self::ALL.iter().position(|s| s == self).unwrap_or(Self::ALL.len() - 1);
        Self::ALL[(idx + 1) % Self::ALL.len()].clone()
    }

    pub fn prev(&self) -> Status {
        let idx = Self::ALL.iter().position(|s| s == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()].clone()
    }
}

impl From<String> for Status {
    fn from(raw: String) -> Self {
        // Exact labels only; persisted data is not normalized.
        match raw.as_str() {
            "Applied" => Status::Applied,
            "In Review" => Status::InReview,
            "Interview" => Status::Interview,
            "Offer" => Status::Offer,
            "Rejected" => Status::Rejected,
            _ => Status::Unrecognized(raw),
        }
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        match status {
            Status::Unrecognized(raw) => raw,
            known => known.label().to_string(),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: i64,
    #[serde(alias = "companyName")]
    pub company: String,
    #[serde(alias = "jobTitle")]
    pub title: String,
    pub status: Status,
    pub date: NaiveDate,
    #[serde(
        alias = "jobLink",
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub link: Option<String>,
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<String>,
}

impl ApplicationRecord {
    pub fn from_fields(id: i64, fields: ApplicationFields) -> Self {
        Self {
            id,
            company: fields.company,
            title: fields.title,
            status: fields.status,
            date: fields.date,
            link: fields.link,
            notes: fields.notes,
        }
    }

    /// Replace everything except the id.
    pub fn apply(&mut self, fields: ApplicationFields) {
        self.company = fields.company;
        self.title = fields.title;
        self.status = fields.status;
        self.date = fields.date;
        self.link = fields.link;
        self.notes = fields.notes;
    }

    pub fn fields(&self) -> ApplicationFields {
        ApplicationFields {
            company: self.company.clone(),
            title: self.title.clone(),
            status: self.status.clone(),
            date: self.date,
            link: self.link.clone(),
            notes: self.notes.clone(),
        }
    }
}

/// Everything about an application that the user supplies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationFields {
    pub company: String,
    pub title: String,
    pub status: Status,
    pub date: NaiveDate,
    pub link: Option<String>,
    pub notes: Option<String>,
}

impl ApplicationFields {
    pub fn new(company: &str, title: &str, status: Status, date: NaiveDate) -> Self {
        Self {
            company: company.trim().to_string(),
            title: title.trim().to_string(),
            status,
            date,
            link: None,
            notes: None,
        }
    }

    pub fn with_link(mut self, link: Option<&str>) -> Self {
        self.link = non_blank(link);
        self
    }

    pub fn with_notes(mut self, notes: Option<&str>) -> Self {
        self.notes = non_blank(notes);
        self
    }
}

pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn blank_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(non_blank(value.as_deref()))
}

/// The demonstration set offered by `apptrack init --samples`.
pub fn sample_applications() -> Vec<ApplicationRecord> {
    let samples = [
        (
            1,
            "Tech Solutions Inc.",
            "Frontend Developer",
            Status::Applied,
            (2024, 2, 15),
            "https://example.com/job1",
            "Applied through company website",
        ),
        (
            2,
            "Digital Innovations",
            "UX Designer",
            Status::Interview,
            (2024, 2, 10),
            "https://example.com/job2",
            "First interview scheduled for next week",
        ),
        (
            3,
            "Software Corp",
            "Full Stack Developer",
            Status::Rejected,
            (2024, 1, 28),
            "https://example.com/job3",
            "Received rejection email",
        ),
        (
            4,
            "Web Systems",
            "JavaScript Developer",
            Status::InReview,
            (2024, 2, 5),
            "https://example.com/job4",
            "HR confirmed application is under review",
        ),
        (
            5,
            "Creative Tech",
            "UI Developer",
            Status::Offer,
            (2024, 1, 15),
            "https://example.com/job5",
            "Received offer letter, considering terms",
        ),
    ];

    samples
        .into_iter()
        .filter_map(|(id, company, title, status, (y, m, d), link, notes)| {
            let date = NaiveDate::from_ymd_opt(y, m, d)?;
            Some(ApplicationRecord::from_fields(
                id,
                ApplicationFields::new(company, title, status, date)
                    .with_link(Some(link))
                    .with_notes(Some(notes)),
            ))
        })
        .collect()
}

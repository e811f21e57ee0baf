use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::models::{ApplicationFields, ApplicationRecord, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Update(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Company,
    Title,
    Status,
    Date,
    Link,
    Notes,
}

impl Field {
    pub const ORDER: [Field; 6] = [
        Field::Company,
        Field::Title,
        Field::Status,
        Field::Date,
        Field::Link,
        Field::Notes,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::Company => "Company",
            Field::Title => "Job Title",
            Field::Status => "Status",
            Field::Date => "Date",
            Field::Link => "Job Link",
            Field::Notes => "Notes",
        }
    }

    pub fn next(self) -> Field {
        let idx = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(idx + 1) % Self::ORDER.len()]
    }

    pub fn prev(self) -> Field {
        let idx = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(idx + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }
}

/// Raw, unvalidated form contents plus the create/update switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    pub company: String,
    pub title: String,
    pub status: Status,
    pub date: String,
    pub link: String,
    pub notes: String,
    pub focus: Field,
    mode: FormMode,
}

impl Form {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            company: String::new(),
            title: String::new(),
            status: Status::Applied,
            date: today.format("%Y-%m-%d").to_string(),
            link: String::new(),
            notes: String::new(),
            focus: Field::Company,
            mode: FormMode::Create,
        }
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn submit_label(&self) -> &'static str {
        match self.mode {
            FormMode::Create => "Add Application",
            FormMode::Update(_) => "Update Application",
        }
    }

    /// Fill the form from `record` and switch submit to update it. Any edit
    /// already in progress is abandoned.
    pub fn begin_edit(&mut self, record: &ApplicationRecord) {
        self.company = record.company.clone();
        self.title = record.title.clone();
        self.status = if record.status.is_known() {
            record.status.clone()
        } else {
            Status::Applied
        };
        self.date = record.date.format("%Y-%m-%d").to_string();
        self.link = record.link.clone().unwrap_or_default();
        self.notes = record.notes.clone().unwrap_or_default();
        self.focus = Field::Company;
        self.mode = FormMode::Update(record.id);
    }

    /// Clear the fields and return to create mode.
    pub fn reset(&mut self, today: NaiveDate) {
        *self = Self::new(today);
    }

    pub fn value_mut(&mut self, field: Field) -> Option<&mut String> {
        match field {
            Field::Company => Some(&mut self.company),
            Field::Title => Some(&mut self.title),
            Field::Date => Some(&mut self.date),
            Field::Link => Some(&mut self.link),
            Field::Notes => Some(&mut self.notes),
            Field::Status => None,
        }
    }

    pub fn display_value(&self, field: Field) -> &str {
        match field {
            Field::Company => &self.company,
            Field::Title => &self.title,
            Field::Status => self.status.label(),
            Field::Date => &self.date,
            Field::Link => &self.link,
            Field::Notes => &self.notes,
        }
    }

    pub fn to_fields(&self) -> Result<ApplicationFields> {
        let date = parse_date(&self.date)?;
        Ok(ApplicationFields::new(&self.company, &self.title, self.status.clone(), date)
            .with_link(Some(self.link.as_str()))
            .with_notes(Some(self.notes.as_str())))
    }
}

pub fn parse_date(input: &str) -> Result<NaiveDate> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::ValidationMissing("date"));
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| Error::InvalidDate(input.to_string()))
}

use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate};
use tracing::debug;

use crate::db::KeyValueStore;
use crate::error::{Error, Result};
use crate::form::{Form, FormMode};
use crate::models::{ApplicationRecord, Status};
use crate::notify::Notifications;
use crate::presentation::{ActionKind, ChartData, RowAction, TableView};
use crate::store::Store;
use crate::views::{counts_by_status, filter};

/// One user session over a store: search state, the form, pending
/// confirmations and the rendered views.
///
/// Every handler that mutates runs store mutation, persistence, view
/// recomputation and redraw preparation in that order before returning.
pub struct App<K> {
    store: Store<K>,
    search: String,
    status_filter: Option<Status>,
    pub form: Form,
    pub notifications: Notifications,
    pending_delete: Option<i64>,
    table: TableView,
    chart: ChartData,
}

impl<K: KeyValueStore> App<K> {
    pub fn new(store: Store<K>, notification_lifetime: Duration) -> Self {
        let mut app = Self {
            store,
            search: String::new(),
            status_filter: None,
            form: Form::new(today()),
            notifications: Notifications::new(notification_lifetime),
            pending_delete: None,
            table: TableView::default(),
            chart: ChartData::from_counts(&counts_by_status(std::iter::empty())),
        };
        app.refresh();
        app
    }

    pub fn store(&self) -> &Store<K> {
        &self.store
    }

    pub fn table(&self) -> &TableView {
        &self.table
    }

    pub fn chart(&self) -> &ChartData {
        &self.chart
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn status_filter(&self) -> Option<&Status> {
        self.status_filter.as_ref()
    }

    pub fn pending_delete(&self) -> Option<&ApplicationRecord> {
        self.pending_delete.and_then(|id| self.store.get(id))
    }

    pub fn set_search(&mut self, term: &str) {
        self.search = term.to_string();
        self.refresh();
    }

    pub fn set_status_filter(&mut self, status: Option<Status>) {
        self.status_filter = status;
        self.refresh();
    }

    /// All → Applied → … → Rejected → All.
    pub fn cycle_status_filter(&mut self) {
        let next = match &self.status_filter {
            None => Some(Status::ALL[0].clone()),
            Some(Status::Rejected) => None,
            Some(current) => Some(current.next()),
        };
        self.set_status_filter(next);
    }

    /// Commit the form: create or update depending on its mode.
    pub fn submit(&mut self, now: Instant) -> Result<ApplicationRecord> {
        let fields = self.form.to_fields()?;
        let record = match self.form.mode() {
            FormMode::Create => {
                let record = self.store.add(fields)?;
                self.notifications.notify(
                    format!("Application to {} added successfully!", record.company),
                    now,
                );
                record
            }
            FormMode::Update(id) => match self.store.update(id, fields) {
                Ok(record) => {
                    self.notifications.notify("Application updated successfully!", now);
                    record
                }
                Err(err @ Error::NotFound(_)) => {
                    // Target vanished while editing; nothing left to update.
                    self.form.reset(today());
                    return Err(err);
                }
                Err(err) => return Err(err),
            },
        };

        self.form.reset(today());
        self.refresh();
        Ok(record)
    }

    pub fn cancel_edit(&mut self) {
        self.form.reset(today());
    }

    /// Act on the row at `index` of the current table.
    pub fn row_action(&mut self, index: usize, kind: ActionKind) -> Option<RowAction> {
        let action = self.table.action(index, kind)?;
        match action {
            RowAction::Edit(id) => {
                let record = self.store.get(id)?;
                self.form.begin_edit(record);
            }
            RowAction::Delete(id) => self.pending_delete = Some(id),
        }
        debug!(?action, "row action");
        Some(action)
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Carry out the delete the user just confirmed.
    pub fn confirm_delete(&mut self, now: Instant) -> Result<bool> {
        let Some(id) = self.pending_delete.take() else {
            return Ok(false);
        };
        let removed = self.store.remove(id)?;
        if removed {
            if self.form.mode() == FormMode::Update(id) {
                self.form.reset(today());
            }
            self.notifications.notify("Application deleted!", now);
        }
        self.refresh();
        Ok(removed)
    }

    pub fn tick(&mut self, now: Instant) {
        self.notifications.prune(now);
    }

    /// Recompute the table from the filtered list and the chart from the
    /// whole collection.
    fn refresh(&mut self) {
        let records = self.store.list();
        self.table = TableView::render(filter(records, &self.search, self.status_filter.as_ref()));
        self.chart = ChartData::from_counts(&counts_by_status(records));
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::sample_applications;
    use crate::storage::{Storage, DEFAULT_KEY};

    fn app() -> App<Database> {
        let storage = Storage::new(Database::open_in_memory().unwrap(), DEFAULT_KEY);
        let store = Store::open(storage, sample_applications()).unwrap();
        App::new(store, Duration::from_secs(5))
    }

    fn fill(form: &mut Form, company: &str, title: &str) {
        form.company = company.to_string();
        form.title = title.to_string();
        form.date = "2024-03-01".to_string();
    }

    #[test]
    fn test_initial_render() {
        let app = app();
        assert_eq!(app.table().len(), 5);
        assert_eq!(app.chart().total(), 5);
    }

    #[test]
    fn test_submit_creates_and_notifies() {
        let mut app = app();
        let now = Instant::now();
        fill(&mut app.form, "Acme", "SRE");

        let record = app.submit(now).unwrap();
        assert_eq!(app.table().rows()[0].id, record.id);
        assert_eq!(app.chart().values[0], 2);
        assert_eq!(app.store().storage().load().unwrap().len(), 6);

        let messages: Vec<&str> = app
            .notifications
            .visible(now)
            .map(|n| n.message.as_str())
            .collect();
        assert_eq!(messages, vec!["Application to Acme added successfully!"]);
        assert_eq!(app.form.mode(), FormMode::Create);
        assert!(app.form.company.is_empty());
    }

    #[test]
    fn test_invalid_submit_changes_nothing() {
        let mut app = app();
        fill(&mut app.form, "", "SRE");
        let err = app.submit(Instant::now()).unwrap_err();
        assert!(matches!(err, Error::ValidationMissing("company")));
        assert_eq!(app.table().len(), 5);
        assert!(app.notifications.is_empty());
        assert_eq!(app.form.title, "SRE");
    }

    #[test]
    fn test_edit_flow() {
        let mut app = app();
        let now = Instant::now();
        let index = app.table().position(2).unwrap();

        assert_eq!(app.row_action(index, ActionKind::Edit), Some(RowAction::Edit(2)));
        assert_eq!(app.form.mode(), FormMode::Update(2));
        app.form.status = Status::Offer;

        let record = app.submit(now).unwrap();
        assert_eq!(record.id, 2);
        assert_eq!(app.store().get(2).unwrap().status, Status::Offer);
        assert_eq!(app.chart().values[2], 0);
        assert_eq!(app.chart().values[3], 2);
        assert_eq!(app.form.mode(), FormMode::Create);
    }

    #[test]
    fn test_cancel_edit_keeps_data() {
        let mut app = app();
        let before = app.store().list().to_vec();
        app.row_action(0, ActionKind::Edit);
        app.form.company = "Changed".into();
        app.cancel_edit();

        assert_eq!(app.form.mode(), FormMode::Create);
        assert_eq!(app.store().list(), before.as_slice());
    }

    #[test]
    fn test_update_of_deleted_target_reports_not_found() {
        let mut app = app();
        let index = app.table().position(3).unwrap();
        app.row_action(index, ActionKind::Edit);
        app.row_action(index, ActionKind::Delete);
        // Delete via the store directly so the form keeps its stale target.
        app.store.remove(3).unwrap();
        app.cancel_delete();

        let err = app.submit(Instant::now()).unwrap_err();
        assert!(matches!(err, Error::NotFound(3)));
        assert_eq!(app.form.mode(), FormMode::Create);
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let mut app = app();
        let now = Instant::now();

        app.row_action(0, ActionKind::Delete);
        assert_eq!(app.pending_delete().map(|r| r.id), Some(5));
        app.cancel_delete();
        assert!(!app.confirm_delete(now).unwrap());
        assert_eq!(app.table().len(), 5);

        app.row_action(0, ActionKind::Delete);
        assert!(app.confirm_delete(now).unwrap());
        assert_eq!(app.table().len(), 4);
        assert_eq!(app.chart().values[3], 0);
        assert_eq!(app.store().storage().load().unwrap().len(), 4);
    }

    #[test]
    fn test_deleting_edit_target_resets_form() {
        let mut app = app();
        app.row_action(0, ActionKind::Edit);
        app.row_action(0, ActionKind::Delete);
        app.confirm_delete(Instant::now()).unwrap();
        assert_eq!(app.form.mode(), FormMode::Create);
    }

    #[test]
    fn test_search_and_filter_only_affect_table() {
        let mut app = app();
        app.set_search("TECH");
        assert_eq!(app.table().len(), 2);
        assert_eq!(app.chart().total(), 5);

        app.set_status_filter(Some(Status::Offer));
        assert_eq!(app.table().len(), 1);
        assert_eq!(app.table().action(0, ActionKind::Edit), Some(RowAction::Edit(5)));

        app.set_search("");
        app.set_status_filter(None);
        assert_eq!(app.table().len(), 5);
    }

    #[test]
    fn test_cycle_status_filter() {
        let mut app = app();
        app.cycle_status_filter();
        assert_eq!(app.status_filter(), Some(&Status::Applied));
        for _ in 0..4 {
            app.cycle_status_filter();
        }
        assert_eq!(app.status_filter(), Some(&Status::Rejected));
        app.cycle_status_filter();
        assert_eq!(app.status_filter(), None);
    }

    #[test]
    fn test_tick_expires_notifications() {
        let mut app = app();
        let now = Instant::now();
        fill(&mut app.form, "Acme", "SRE");
        app.submit(now).unwrap();
        app.tick(now + Duration::from_secs(6));
        assert!(app.notifications.is_empty());
    }
}

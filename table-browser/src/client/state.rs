//! View state and its transitions
//!
//! [`ViewState`] is a plain value: user actions mutate it and return the
//! [`Command`]s the caller has to carry out (fetches, debounce timers), and
//! fetch completions are fed back with the token they were issued under.
//! Nothing in here performs I/O or reads a clock.
//!
//! Every fetch gets a token from one increasing counter. Only the token most
//! recently issued for a slot (databases, tables, rows) is accepted back, so
//! a slow response can never overwrite a newer one.

use std::collections::BTreeMap;

use crate::client::api::FetchError;
use crate::schema::{Record, SortDirection, SortSpec, ViewRequest, ViewResult};

/// Identifies one issued fetch
pub type RequestToken = u64;

/// Default number of rows per page
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Lifecycle of an open table view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewPhase {
    #[default]
    Idle,
    Loading,
    Loaded,
    Error,
}

/// Work requested by a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    FetchDatabases { token: RequestToken },
    FetchTables { token: RequestToken, database: String },
    FetchRows { token: RequestToken, request: ViewRequest },

    /// Restart the filter debounce timer; call [`ViewState::commit_filters`] when it fires
    ScheduleFilterCommit,

    /// Drop a pending filter debounce timer
    CancelFilterCommit,
}

/// State of the currently expanded table
#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub table: String,
    pub page: u64,
    pub page_size: u64,
    pub sort: Option<SortSpec>,

    /// Filter inputs as typed, blank values included
    pub filters: BTreeMap<String, String>,

    pub phase: ViewPhase,
    pub rows: Vec<Record>,

    /// Column headers, taken from the first row of the latest non-empty page
    pub columns: Vec<String>,

    pub total_count: u64,
    pub total_pages: u64,
    pub error: Option<String>,
}

impl TableView {
    fn new(table: String, page_size: u64) -> Self {
        Self {
            table,
            page: 1,
            page_size,
            sort: None,
            filters: BTreeMap::new(),
            phase: ViewPhase::Idle,
            rows: Vec::new(),
            columns: Vec::new(),
            total_count: 0,
            total_pages: 0,
            error: None,
        }
    }

    /// The request that fetches what this view currently shows
    pub fn request(&self, database: Option<&str>) -> ViewRequest {
        let mut request = ViewRequest::new(self.table.clone(), self.page, self.page_size)
            .with_filters(self.filters.clone());
        request.database = database.map(str::to_string);
        request.sort = self.sort.clone();
        request
    }

    pub fn is_loading(&self) -> bool {
        self.phase == ViewPhase::Loading
    }
}

/// Everything the browser UI shows
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    page_size: u64,

    pub databases: Vec<String>,
    pub databases_loading: bool,
    pub selected_database: Option<String>,
    pub tables: Vec<String>,
    pub tables_loading: bool,

    /// Error from the last database or table listing, if it failed
    pub listing_error: Option<String>,

    pub open_table: Option<TableView>,

    next_token: RequestToken,
    databases_token: Option<RequestToken>,
    tables_token: Option<RequestToken>,
    rows_token: Option<RequestToken>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl ViewState {
    pub fn new(page_size: u64) -> Self {
        Self {
            page_size: page_size.max(1),
            databases: Vec::new(),
            databases_loading: false,
            selected_database: None,
            tables: Vec::new(),
            tables_loading: false,
            listing_error: None,
            open_table: None,
            next_token: 0,
            databases_token: None,
            tables_token: None,
            rows_token: None,
        }
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    fn issue_token(&mut self) -> RequestToken {
        self.next_token += 1;
        self.next_token
    }

    /// Start loading the database list
    pub fn mount(&mut self) -> Vec<Command> {
        let token = self.issue_token();
        self.databases_token = Some(token);
        self.databases_loading = true;
        vec![Command::FetchDatabases { token }]
    }

    /// Switch to another database, closing any open table
    pub fn select_database(&mut self, database: impl Into<String>) -> Vec<Command> {
        let database = database.into();
        let mut commands = self.close_table();

        let token = self.issue_token();
        self.tables_token = Some(token);
        self.tables_loading = true;
        self.tables.clear();
        self.listing_error = None;
        self.selected_database = Some(database.clone());

        commands.push(Command::FetchTables { token, database });
        commands
    }

    /// Expand a table, or collapse it if it is the one already open
    ///
    /// Opening always starts from a fresh view: page 1, no sort, no filters.
    pub fn toggle_table(&mut self, table: impl Into<String>) -> Vec<Command> {
        let table = table.into();
        let already_open = self
            .open_table
            .as_ref()
            .is_some_and(|view| view.table == table);

        let mut commands = self.close_table();
        if already_open {
            return commands;
        }

        self.open_table = Some(TableView::new(table, self.page_size));
        commands.extend(self.fetch_rows());
        commands
    }

    /// Collapse the open table and forget its page, sort and filters
    pub fn close_table(&mut self) -> Vec<Command> {
        self.rows_token = None;
        match self.open_table.take() {
            Some(_) => vec![Command::CancelFilterCommit],
            None => Vec::new(),
        }
    }

    /// Go to another page of the open table
    ///
    /// Ignored for page 0, for the current page, and for pages past the
    /// known end.
    pub fn set_page(&mut self, page: u64) -> Vec<Command> {
        let Some(view) = self.open_table.as_mut() else {
            return Vec::new();
        };

        let past_end = view.total_pages > 0 && page > view.total_pages;
        if page == 0 || page == view.page || past_end {
            return Vec::new();
        }

        view.page = page;
        self.fetch_rows()
    }

    /// Handle a click on a column header
    ///
    /// A new column sorts ascending; the sorted column flips direction.
    pub fn click_sort(&mut self, column: impl Into<String>) -> Vec<Command> {
        let column = column.into();
        let Some(view) = self.open_table.as_mut() else {
            return Vec::new();
        };

        let direction = match &view.sort {
            Some(sort) if sort.column == column => sort.direction.flipped(),
            _ => SortDirection::Asc,
        };
        view.sort = Some(SortSpec { column, direction });

        self.fetch_rows()
    }

    /// Record a filter keystroke; the fetch waits for the debounce timer
    pub fn edit_filter(&mut self, column: impl Into<String>, value: impl Into<String>) -> Vec<Command> {
        let Some(view) = self.open_table.as_mut() else {
            return Vec::new();
        };

        view.filters.insert(column.into(), value.into());
        vec![Command::ScheduleFilterCommit]
    }

    /// The debounce timer fired: fetch page 1 with the current filters
    pub fn commit_filters(&mut self) -> Vec<Command> {
        let Some(view) = self.open_table.as_mut() else {
            return Vec::new();
        };

        view.page = 1;
        self.fetch_rows()
    }

    fn fetch_rows(&mut self) -> Vec<Command> {
        let token = self.issue_token();
        let database = self.selected_database.clone();

        let Some(view) = self.open_table.as_mut() else {
            return Vec::new();
        };

        view.phase = ViewPhase::Loading;
        view.error = None;
        self.rows_token = Some(token);

        vec![Command::FetchRows {
            token,
            request: view.request(database.as_deref()),
        }]
    }

    /// Apply a database listing; returns whether it was current
    pub fn apply_databases(&mut self, token: RequestToken, result: Result<Vec<String>, FetchError>) -> bool {
        if self.databases_token != Some(token) {
            return false;
        }
        self.databases_token = None;
        self.databases_loading = false;

        match result {
            Ok(databases) => {
                self.databases = databases;
                self.listing_error = None;
            }
            Err(error) => {
                self.databases.clear();
                self.listing_error = Some(error.to_string());
            }
        }
        true
    }

    /// Apply a table listing; returns whether it was current
    pub fn apply_tables(&mut self, token: RequestToken, result: Result<Vec<String>, FetchError>) -> bool {
        if self.tables_token != Some(token) {
            return false;
        }
        self.tables_token = None;
        self.tables_loading = false;

        match result {
            Ok(tables) => {
                self.tables = tables;
                self.listing_error = None;
            }
            Err(error) => {
                self.tables.clear();
                self.listing_error = Some(error.to_string());
            }
        }
        true
    }

    /// Apply a page of rows; returns whether it was current
    ///
    /// Responses to anything but the latest rows fetch are dropped. An empty
    /// page keeps the known columns so the header row stays in place.
    pub fn apply_rows(&mut self, token: RequestToken, result: Result<ViewResult, FetchError>) -> bool {
        if self.rows_token != Some(token) {
            return false;
        }
        let Some(view) = self.open_table.as_mut() else {
            return false;
        };
        self.rows_token = None;

        match result {
            Ok(result) => {
                if let Some(first) = result.rows.first() {
                    view.columns = first.keys().cloned().collect();
                }
                view.rows = result.rows;
                view.total_count = result.total_count;
                view.total_pages = result.total_pages;
                view.phase = ViewPhase::Loaded;
                view.error = None;
            }
            Err(error) => {
                view.rows.clear();
                view.total_count = 0;
                view.total_pages = 0;
                view.phase = ViewPhase::Error;
                view.error = Some(error.to_string());
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(ids: &[u64], total_count: u64, page: u64) -> ViewResult {
        let rows = ids
            .iter()
            .map(|id| {
                json!({ "id": id, "name": format!("user {id}") })
                    .as_object()
                    .unwrap()
                    .clone()
            })
            .collect();
        ViewResult::new(rows, total_count, page, DEFAULT_PAGE_SIZE)
    }

    fn rows_fetch(commands: &[Command]) -> (RequestToken, ViewRequest) {
        commands
            .iter()
            .find_map(|command| match command {
                Command::FetchRows { token, request } => Some((*token, request.clone())),
                _ => None,
            })
            .expect("expected a rows fetch")
    }

    fn opened(table: &str) -> (ViewState, RequestToken) {
        let mut state = ViewState::default();
        state.select_database("shop");
        let (token, _) = rows_fetch(&state.toggle_table(table));
        (state, token)
    }

    #[test]
    fn test_mount_fetches_databases() {
        let mut state = ViewState::default();
        let commands = state.mount();
        assert!(state.databases_loading);

        let Command::FetchDatabases { token } = commands[0] else {
            panic!("expected a database fetch");
        };
        assert!(state.apply_databases(token, Ok(vec!["shop".to_string()])));
        assert!(!state.databases_loading);
        assert_eq!(state.databases, vec!["shop"]);
    }

    #[test]
    fn test_open_table_requests_first_page() {
        let mut state = ViewState::new(50);
        state.select_database("shop");
        let (_, request) = rows_fetch(&state.toggle_table("users"));

        assert_eq!(request, ViewRequest::new("users", 1, 50).with_database("shop"));
        assert!(state.open_table.as_ref().unwrap().is_loading());
    }

    #[test]
    fn test_sort_toggle() {
        let (mut state, _) = opened("users");

        let (_, request) = rows_fetch(&state.click_sort("age"));
        assert_eq!(request.sort.unwrap().direction, SortDirection::Asc);

        let (_, request) = rows_fetch(&state.click_sort("age"));
        assert_eq!(request.sort.unwrap().direction, SortDirection::Desc);

        let (_, request) = rows_fetch(&state.click_sort("age"));
        assert_eq!(request.sort.unwrap().direction, SortDirection::Asc);

        state.click_sort("age");
        let (_, request) = rows_fetch(&state.click_sort("name"));
        let sort = request.sort.unwrap();
        assert_eq!(sort.column, "name");
        assert_eq!(sort.direction, SortDirection::Asc);
    }

    #[test]
    fn test_filter_edit_waits_for_commit_and_resets_page() {
        let (mut state, token) = opened("users");
        state.apply_rows(token, Ok(page(&[1, 2], 100, 1)));
        state.set_page(3);

        let commands = state.edit_filter("name", "al");
        assert_eq!(commands, vec![Command::ScheduleFilterCommit]);
        assert_eq!(state.open_table.as_ref().unwrap().page, 3);

        let (_, request) = rows_fetch(&state.commit_filters());
        assert_eq!(request.page, 1);
        assert_eq!(request.filters.get("name").map(String::as_str), Some("al"));
    }

    #[test]
    fn test_blank_filters_are_not_sent() {
        let (mut state, _) = opened("users");
        state.edit_filter("name", "al");
        state.edit_filter("email", "  ");

        let (_, request) = rows_fetch(&state.commit_filters());
        assert_eq!(request.filters.len(), 1);
        assert_eq!(state.open_table.as_ref().unwrap().filters.len(), 2);
    }

    #[test]
    fn test_stale_rows_are_discarded() {
        let (mut state, first_token) = opened("users");
        let (second_token, _) = rows_fetch(&state.set_page(2));

        assert!(state.apply_rows(second_token, Ok(page(&[21, 22], 40, 2))));
        assert!(!state.apply_rows(first_token, Ok(page(&[1, 2], 40, 1))));

        let view = state.open_table.as_ref().unwrap();
        assert_eq!(view.page, 2);
        assert_eq!(view.rows[0]["id"], 21);
        assert_eq!(view.phase, ViewPhase::Loaded);
    }

    #[test]
    fn test_rows_for_closed_table_are_discarded() {
        let (mut state, token) = opened("users");
        state.toggle_table("users");
        assert!(state.open_table.is_none());
        assert!(!state.apply_rows(token, Ok(page(&[1], 1, 1))));

        let (mut state, token) = opened("users");
        let (reopened_token, _) = rows_fetch(&state.toggle_table("orders"));
        assert!(!state.apply_rows(token, Ok(page(&[1], 1, 1))));
        assert!(state.apply_rows(reopened_token, Ok(page(&[7], 1, 1))));
        assert_eq!(state.open_table.as_ref().unwrap().table, "orders");
    }

    #[test]
    fn test_close_resets_view() {
        let (mut state, token) = opened("users");
        state.apply_rows(token, Ok(page(&[1, 2], 100, 1)));
        state.click_sort("name");
        state.edit_filter("name", "al");
        state.set_page(4);

        let commands = state.toggle_table("users");
        assert_eq!(commands, vec![Command::CancelFilterCommit]);

        let (_, request) = rows_fetch(&state.toggle_table("users"));
        assert_eq!(request.page, 1);
        assert!(request.sort.is_none());
        assert!(request.filters.is_empty());
    }

    #[test]
    fn test_empty_page_keeps_columns() {
        let (mut state, token) = opened("users");
        state.apply_rows(token, Ok(page(&[1], 1, 1)));
        assert_eq!(state.open_table.as_ref().unwrap().columns, vec!["id", "name"]);

        state.edit_filter("name", "zzz");
        let (token, _) = rows_fetch(&state.commit_filters());
        state.apply_rows(token, Ok(ViewResult::empty(1)));

        let view = state.open_table.as_ref().unwrap();
        assert!(view.rows.is_empty());
        assert_eq!(view.columns, vec!["id", "name"]);
        assert_eq!(view.phase, ViewPhase::Loaded);
    }

    #[test]
    fn test_failure_clears_rows() {
        let (mut state, token) = opened("users");
        state.apply_rows(token, Ok(page(&[1, 2], 2, 1)));

        let (token, _) = rows_fetch(&state.click_sort("id"));
        let error = FetchError::Status {
            status: 500,
            message: "boom".to_string(),
        };
        assert!(state.apply_rows(token, Err(error)));

        let view = state.open_table.as_ref().unwrap();
        assert_eq!(view.phase, ViewPhase::Error);
        assert!(view.rows.is_empty());
        assert_eq!(view.total_count, 0);
        assert!(!view.is_loading());
        assert!(view.error.as_deref().unwrap().contains("boom"));
    }

    #[test]
    fn test_set_page_bounds() {
        let (mut state, token) = opened("users");
        state.apply_rows(token, Ok(page(&[1], 45, 1)));

        assert!(state.set_page(0).is_empty());
        assert!(state.set_page(1).is_empty());
        assert!(state.set_page(4).is_empty());
        assert_eq!(rows_fetch(&state.set_page(3)).1.page, 3);
    }

    #[test]
    fn test_select_database_discards_older_table_listing() {
        let mut state = ViewState::default();
        let Command::FetchTables { token: first, .. } = state.select_database("shop")[0].clone() else {
            panic!("expected a table fetch");
        };
        let commands = state.select_database("archive");
        let Some(Command::FetchTables { token: second, database }) = commands.last().cloned() else {
            panic!("expected a table fetch");
        };
        assert_eq!(database, "archive");

        assert!(state.apply_tables(second, Ok(vec!["logs".to_string()])));
        assert!(!state.apply_tables(first, Ok(vec!["users".to_string()])));
        assert_eq!(state.tables, vec!["logs"]);
    }
}

//! Client-side view state machine
//!
//! Keeps the browser UI's database, table, paging, sorting and filtering
//! state consistent with the asynchronous fetches it issues.
//!
//! - [`state`] holds the state and its transitions, free of I/O
//! - [`controller`] drives it on Tokio with debounced filters
//! - [`http`] talks to the table browser API over HTTP

pub mod api;
pub mod controller;
pub mod debounce;
pub mod http;
pub mod state;

pub use api::{FetchError, ViewApi};
pub use controller::{ControllerClosed, ControllerOptions, UserAction, ViewController};
pub use debounce::Debouncer;
pub use http::HttpViewClient;
pub use state::{Command, RequestToken, TableView, ViewPhase, ViewState};

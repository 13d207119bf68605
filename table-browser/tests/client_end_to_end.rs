//! The view client against a live server

mod common;

use std::sync::Arc;
use std::time::Duration;
use table_browser::client::{
    ControllerOptions, FetchError, HttpViewClient, UserAction, ViewApi, ViewController, ViewPhase,
    ViewState,
};
use table_browser::{BrowserLayer, SortDirection, ViewRequest};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::watch;

async fn serve() -> (TempDir, String) {
    let directory = common::seeded_directory().await;
    let router = BrowserLayer::sqlite("/browser", directory.path(), Some("shop".to_string())).into_router();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (directory, format!("http://{address}/browser"))
}

async fn wait_until(
    receiver: &mut watch::Receiver<ViewState>,
    condition: impl FnMut(&ViewState) -> bool,
) -> ViewState {
    tokio::time::timeout(Duration::from_secs(10), receiver.wait_for(condition))
        .await
        .expect("state never reached")
        .unwrap()
        .clone()
}

#[tokio::test]
async fn test_http_client_reads_listings() {
    let (_directory, base_url) = serve().await;
    let client = HttpViewClient::new(&base_url).unwrap();

    assert_eq!(client.list_databases().await.unwrap(), vec!["shop", "void"]);
    assert_eq!(client.list_tables("shop").await.unwrap(), vec!["audit_log", "users"]);
}

#[tokio::test]
async fn test_http_client_fetches_pages() {
    let (_directory, base_url) = serve().await;
    let client = HttpViewClient::new(&base_url).unwrap();

    let request = ViewRequest::new("users", 2, 10)
        .with_database("shop")
        .with_sort("id", SortDirection::Desc)
        .with_filter("city", "lis");
    let result = client.fetch_rows(&request).await.unwrap();

    // Lisbon holds ids 2, 5, 8, ..., 44: fifteen rows
    assert_eq!(result.total_count, 15);
    assert_eq!(result.total_pages, 2);
    assert_eq!(result.current_page, 2);
    let ids: Vec<i64> = result.rows.iter().map(|row| row["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![14, 11, 8, 5, 2]);
}

#[tokio::test]
async fn test_http_client_maps_empty_and_failing_pages() {
    let (_directory, base_url) = serve().await;
    let client = HttpViewClient::new(&base_url).unwrap();

    let empty = client
        .fetch_rows(&ViewRequest::new("audit_log", 1, 20))
        .await
        .unwrap();
    assert!(empty.rows.is_empty());
    assert_eq!(empty.total_count, 0);

    let error = client
        .fetch_rows(&ViewRequest::new("users;", 1, 20))
        .await
        .unwrap_err();
    assert!(matches!(error, FetchError::Status { status: 400, .. }));
}

#[tokio::test]
async fn test_controller_browses_a_table() {
    let (_directory, base_url) = serve().await;
    let api: Arc<dyn ViewApi> = Arc::new(HttpViewClient::new(&base_url).unwrap());
    let controller = ViewController::spawn(
        api,
        ControllerOptions {
            page_size: 20,
            filter_debounce: Duration::from_millis(50),
        },
    );
    let mut states = controller.subscribe();

    let state = wait_until(&mut states, |state| !state.databases_loading).await;
    assert_eq!(state.databases, vec!["shop", "void"]);

    controller.dispatch(UserAction::SelectDatabase("shop".to_string())).unwrap();
    let state = wait_until(&mut states, |state| !state.tables_loading && !state.tables.is_empty()).await;
    assert_eq!(state.tables, vec!["audit_log", "users"]);

    controller.dispatch(UserAction::ToggleTable("users".to_string())).unwrap();
    let state = wait_until(&mut states, |state| {
        state.open_table.as_ref().is_some_and(|view| view.phase == ViewPhase::Loaded)
    })
    .await;
    let view = state.open_table.unwrap();
    assert_eq!(view.total_count, 45);
    assert_eq!(view.total_pages, 3);
    assert_eq!(view.columns, vec!["id", "name", "age", "city"]);

    controller.dispatch(UserAction::SetPage(3)).unwrap();
    let state = wait_until(&mut states, |state| {
        state
            .open_table
            .as_ref()
            .is_some_and(|view| view.page == 3 && view.phase == ViewPhase::Loaded)
    })
    .await;
    assert_eq!(state.open_table.unwrap().rows.len(), 5);

    // Filtering goes back to the first page once the debounce fires
    controller
        .dispatch(UserAction::EditFilter {
            column: "name".to_string(),
            value: "alice".to_string(),
        })
        .unwrap();
    let state = wait_until(&mut states, |state| {
        state
            .open_table
            .as_ref()
            .is_some_and(|view| view.total_count == 5 && view.phase == ViewPhase::Loaded)
    })
    .await;
    let view = state.open_table.unwrap();
    assert_eq!(view.page, 1);
    assert_eq!(view.rows.len(), 5);
}

#[tokio::test]
async fn test_controller_shows_empty_table() {
    let (_directory, base_url) = serve().await;
    let api: Arc<dyn ViewApi> = Arc::new(HttpViewClient::new(&base_url).unwrap());
    let controller = ViewController::spawn(api, ControllerOptions::default());
    let mut states = controller.subscribe();

    controller.dispatch(UserAction::SelectDatabase("shop".to_string())).unwrap();
    controller.dispatch(UserAction::ToggleTable("audit_log".to_string())).unwrap();

    let state = wait_until(&mut states, |state| {
        state
            .open_table
            .as_ref()
            .is_some_and(|view| view.phase == ViewPhase::Loaded)
    })
    .await;
    let view = state.open_table.unwrap();
    assert!(view.rows.is_empty());
    assert_eq!(view.total_pages, 0);
    assert!(view.error.is_none());
}

#[tokio::test]
async fn test_unknown_database_is_an_error() {
    let (_directory, base_url) = serve().await;
    let client = HttpViewClient::new(&base_url).unwrap();

    let error = client
        .fetch_rows(&ViewRequest::new("users", 1, 20).with_database("missing"))
        .await
        .unwrap_err();
    assert!(matches!(error, FetchError::Status { status: 404, ref message } if message.contains("missing")));

    let error = client.list_tables("missing").await.unwrap_err();
    assert!(matches!(error, FetchError::Status { status: 404, .. }));

    assert_eq!(client.list_tables("void").await.unwrap(), vec!["empty_things"]);
}

#[tokio::test]
async fn test_controller_reports_unknown_database() {
    let (_directory, base_url) = serve().await;
    let api: Arc<dyn ViewApi> = Arc::new(HttpViewClient::new(&base_url).unwrap());
    let controller = ViewController::spawn(api, ControllerOptions::default());
    let mut states = controller.subscribe();

    controller.dispatch(UserAction::SelectDatabase("missing".to_string())).unwrap();
    let state = wait_until(&mut states, |state| !state.tables_loading && state.listing_error.is_some()).await;
    assert!(state.tables.is_empty());

    controller.dispatch(UserAction::ToggleTable("users".to_string())).unwrap();
    let state = wait_until(&mut states, |state| {
        state
            .open_table
            .as_ref()
            .is_some_and(|view| view.phase == ViewPhase::Error)
    })
    .await;
    let view = state.open_table.unwrap();
    assert!(view.rows.is_empty());
    assert_eq!(view.total_count, 0);
    assert!(view.error.unwrap().contains("missing"));
}

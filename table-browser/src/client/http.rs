//! HTTP client for the table browser API

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::client::api::{FetchError, ViewApi};
use crate::schema::{Record, ViewRequest, ViewResult};

/// [`ViewApi`] over HTTP
#[derive(Debug, Clone)]
pub struct HttpViewClient {
    client: Client,
    base_url: Url,
}

impl HttpViewClient {
    /// Create a client for a server whose API lives at `{base_url}/api`
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an absolute http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        Self::with_client(Client::new(), base_url)
    }

    /// Same as [`HttpViewClient::new`] with a preconfigured reqwest client
    pub fn with_client(client: Client, base_url: &str) -> Result<Self, FetchError> {
        let base_url = Url::parse(base_url)
            .map_err(|error| FetchError::Transport(format!("Invalid base URL {base_url:?}: {error}")))?;
        if base_url.cannot_be_a_base() {
            return Err(FetchError::Transport(format!("Invalid base URL {base_url}")));
        }
        Ok(Self { client, base_url })
    }

    /// Build `{base}/api/{segments...}`, percent-encoding each segment
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("api").extend(segments);
        }
        url
    }

    /// Send a GET; only transport failures are errors here
    async fn send(&self, url: Url) -> Result<Response, FetchError> {
        self.client
            .get(url)
            .send()
            .await
            .map_err(|error| FetchError::Transport(error.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, FetchError> {
        let response = self.send(url).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response).await);
        }

        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, FetchError> {
    response
        .json()
        .await
        .map_err(|error| FetchError::Decode(error.to_string()))
}

/// Turn a non-success response into an error, keeping the server's message
async fn status_error(status: StatusCode, response: Response) -> FetchError {
    let body = response.text().await.unwrap_or_default();
    error_from_body(status, body)
}

fn error_from_body(status: StatusCode, body: String) -> FetchError {
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|value| value.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(body);

    FetchError::Status {
        status: status.as_u16(),
        message,
    }
}

/// Read a 404 answer
///
/// The server answers 404 both for an empty result and for a database that
/// does not exist. Only the first carries page counts next to `error`.
async fn not_found(response: Response) -> Result<ViewResult, FetchError> {
    let body = response.text().await.unwrap_or_default();
    empty_result_from_body(body)
}

fn empty_result_from_body(body: String) -> Result<ViewResult, FetchError> {
    match serde_json::from_str::<Value>(&body) {
        Ok(value) if value.get("totalCount").is_some() => {
            serde_json::from_value(value).map_err(|error| FetchError::Decode(error.to_string()))
        }
        _ => Err(error_from_body(StatusCode::NOT_FOUND, body)),
    }
}

/// First string value of each record
///
/// Listing endpoints key names by backend-specific columns, so the key is
/// not looked at.
fn names(records: Vec<Record>) -> Vec<String> {
    records
        .into_iter()
        .filter_map(|record| record.values().find_map(Value::as_str).map(str::to_string))
        .collect()
}

#[async_trait]
impl ViewApi for HttpViewClient {
    async fn list_databases(&self) -> Result<Vec<String>, FetchError> {
        let records: Vec<Record> = self.get_json(self.endpoint(&["databases"])).await?;
        Ok(names(records))
    }

    async fn list_tables(&self, database: &str) -> Result<Vec<String>, FetchError> {
        let response = self.send(self.endpoint(&["tableNames", database])).await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            not_found(response).await?;
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(status_error(status, response).await);
        }

        let records: Vec<Record> = decode(response).await?;
        Ok(names(records))
    }

    #[instrument(skip(self, request), fields(table = %request.table, page = request.page))]
    async fn fetch_rows(&self, request: &ViewRequest) -> Result<ViewResult, FetchError> {
        let page = request.page.to_string();
        let page_size = request.page_size.to_string();
        let mut url = self.endpoint(&["rows", &request.table, &page, &page_size]);

        {
            let mut query = url.query_pairs_mut();
            if let Some(database) = &request.database {
                query.append_pair("database", database);
            }
            if let Some(sort) = &request.sort {
                query.append_pair("sortBy", &sort.column);
                query.append_pair("sortDirection", sort.direction.as_param());
            }
            if !request.filters.is_empty() {
                let filters = serde_json::to_string(&request.filters)
                    .map_err(|error| FetchError::Decode(error.to_string()))?;
                query.append_pair("filters", &filters);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }

        let response = self.send(url).await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            let result = not_found(response).await?;
            debug!(total_count = result.total_count, "Server reported no data");
            return Ok(result);
        }
        if !status.is_success() {
            return Err(status_error(status, response).await);
        }

        decode(response).await
    }
}

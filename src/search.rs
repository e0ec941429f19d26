//! Client for a full-text search server speaking the Manticore/Sphinx HTTP
//! JSON protocol.

use std::sync::Mutex;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Which slice of the matches a query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Limits {
	pub offset: u64,
	pub limit: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Match {
	pub id: i64,
	pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchResult {
	pub total_found: u64,
	pub matches: Vec<Match>,
}

impl SearchResult {
	pub fn ids(&self) -> Vec<i64> {
		self.matches.iter().map(|m| m.id).collect()
	}
}

#[async_trait::async_trait]
pub trait SearchClient: Send + Sync {
	/// Run `query` against `index`. `None` means the query failed, see
	/// [`SearchClient::last_error`].
	async fn query(&self, query: &str, index: &str, limits: Limits) -> Option<SearchResult>;

	fn last_error(&self) -> String;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DocumentId {
	Number(i64),
	Text(String),
}

impl DocumentId {
	fn value(self) -> Option<i64> {
		match self {
			Self::Number(id) => Some(id),
			Self::Text(id) => id.parse().ok(),
		}
	}
}

#[derive(Deserialize)]
struct Hit {
	#[serde(rename = "_id")]
	id: DocumentId,
	#[serde(rename = "_score", default)]
	score: f64,
}

#[derive(Deserialize)]
struct Hits {
	total: u64,
	#[serde(default)]
	hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct SearchResponse {
	hits: Hits,
}

impl From<SearchResponse> for SearchResult {
	fn from(response: SearchResponse) -> Self {
		let matches = response.hits.hits.into_iter()
			.filter_map(|hit| {
				let weight = hit.score;
				hit.id.value().map(|id| Match { id, weight })
			})
			.collect();

		Self { total_found: response.hits.total, matches }
	}
}

#[derive(Deserialize)]
struct ErrorResponse {
	error: Value,
}

/// A [`SearchClient`] for a Manticore compatible `/search` endpoint.
#[derive(Debug, Default)]
pub struct SearchServerClient {
	http: Client,
	server: Option<(String, u16)>,
	filters: Vec<(String, Vec<i64>)>,
	last_error: Mutex<String>,
}

impl Clone for SearchServerClient {
	fn clone(&self) -> Self {
		Self {
			http: self.http.clone(),
			server: self.server.clone(),
			filters: self.filters.clone(),
			last_error: Mutex::default(),
		}
	}
}

impl SearchServerClient {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set_server(&mut self, host: &str, port: u16) {
		self.server = Some((host.to_owned(), port));
	}

	/// Only match documents whose `attribute` is one of `values`.
	pub fn set_filter(&mut self, attribute: &str, values: Vec<i64>) {
		self.filters.push((attribute.to_owned(), values));
	}

	pub fn reset_filters(&mut self) {
		self.filters.clear();
	}

	fn body(&self, query: &str, index: &str, limits: Limits) -> Value {
		let mut must = vec![json!({ "query_string": query })];
		must.extend(self.filters.iter().map(|(attribute, values)| {
			json!({ "in": { attribute.as_str(): values } })
		}));

		json!({
			"index": index,
			"query": { "bool": { "must": must } },
			"offset": limits.offset,
			"limit": limits.limit,
		})
	}

	fn fail(&self, error: String) -> Option<SearchResult> {
		tracing::warn!(%error, "search query failed");
		if let Ok(mut last_error) = self.last_error.lock() {
			*last_error = error;
		}
		None
	}
}

#[async_trait::async_trait]
impl SearchClient for SearchServerClient {
	async fn query(&self, query: &str, index: &str, limits: Limits) -> Option<SearchResult> {
		let Some((host, port)) = &self.server else {
			return self.fail(String::from("no search server set"));
		};

		let url = format!("http://{}:{}/search", host, port);
		let response = match self.http.post(url)
			.json(&self.body(query, index, limits))
			.send().await
		{
			Ok(response) => response,
			Err(error) => return self.fail(error.to_string()),
		};

		let status = response.status();
		let text = match response.text().await {
			Ok(text) => text,
			Err(error) => return self.fail(error.to_string()),
		};

		if !status.is_success() {
			let error = serde_json::from_str::<ErrorResponse>(&text)
				.map(|response| match response.error {
					Value::String(error) => error,
					other => other.to_string(),
				})
				.unwrap_or_else(|_| format!("search server returned {}", status));
			return self.fail(error);
		}

		match serde_json::from_str::<SearchResponse>(&text) {
			Ok(response) => Some(response.into()),
			Err(error) => self.fail(error.to_string()),
		}
	}

	fn last_error(&self) -> String {
		self.last_error.lock()
			.map(|error| error.clone())
			.unwrap_or_default()
	}
}

#[cfg(test)]
mod tests {
	use std::net::SocketAddr;

	use warp::http::StatusCode;
	use warp::Filter;

	use super::*;

	async fn serve(status: StatusCode, body: Value) -> SocketAddr {
		let route = warp::post()
			.and(warp::path("search"))
			.and(warp::body::json())
			.map(move |request: Value| {
				assert_eq!(request["index"], "products");
				warp::reply::with_status(warp::reply::json(&body), status)
			});

		let (address, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
		tokio::spawn(server);
		address
	}

	fn client(address: SocketAddr) -> SearchServerClient {
		let mut client = SearchServerClient::new();
		client.set_server(&address.ip().to_string(), address.port());
		client
	}

	#[test]
	fn body_carries_filters_and_limits() {
		let mut client = SearchServerClient::new();
		client.set_filter("category", vec![3, 4]);

		let body = client.body("red shoe", "products", Limits { offset: 20, limit: 10 });
		assert_eq!(body, json!({
			"index": "products",
			"query": { "bool": { "must": [
				{ "query_string": "red shoe" },
				{ "in": { "category": [3, 4] } },
			] } },
			"offset": 20,
			"limit": 10,
		}));
	}

	#[tokio::test]
	async fn clone_keeps_filters_but_not_errors() {
		let mut client = SearchServerClient::new();
		client.set_filter("category", vec![3]);
		assert!(client.query("shoe", "products", Limits { offset: 0, limit: 2 }).await.is_none());

		let copy = client.clone();
		let limits = Limits { offset: 10, limit: 10 };
		assert_eq!(copy.body("shoe", "products", limits), client.body("shoe", "products", limits));
		assert_eq!(copy.last_error(), "");
	}

	#[tokio::test]
	async fn parses_matches() {
		let address = serve(StatusCode::OK, json!({
			"took": 1,
			"timed_out": false,
			"hits": {
				"total": 31,
				"hits": [
					{ "_id": 7, "_score": 2500, "_source": {} },
					{ "_id": "12", "_score": 1500, "_source": {} },
				],
			},
		})).await;

		let result = client(address)
			.query("shoe", "products", Limits { offset: 0, limit: 2 }).await
			.unwrap();
		assert_eq!(result.total_found, 31);
		assert_eq!(result.ids(), vec![7, 12]);
		assert_eq!(result.matches[0].weight, 2500.0);
	}

	#[tokio::test]
	async fn keeps_last_error() {
		let address = serve(
			StatusCode::INTERNAL_SERVER_ERROR,
			json!({ "error": "unknown local index 'products'" }),
		).await;

		let client = client(address);
		assert!(client.query("shoe", "products", Limits { offset: 0, limit: 2 }).await.is_none());
		assert_eq!(client.last_error(), "unknown local index 'products'");
	}

	#[tokio::test]
	async fn unset_server_fails() {
		let client = SearchServerClient::new();
		assert!(client.query("shoe", "products", Limits { offset: 0, limit: 2 }).await.is_none());
		assert_eq!(client.last_error(), "no search server set");
	}
}

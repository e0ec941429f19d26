use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::database::Model;
use crate::search::{Limits, SearchClient, SearchResult, SearchServerClient};

use super::{PageWindow, Paginate, PaginationError};

/// Most matches the search server hands back in one query.
pub const ALL_ITEMS_LIMIT: u64 = 1000;

/// Pagination over the matches of a full-text search.
///
/// Nothing is sent to the server until the count or the items are first
/// asked for; the result is then kept for the life of the object.
pub struct SearchPagination<M, S> {
	model: Arc<M>,
	client: S,
	query: String,
	index: String,
	window: PageWindow,
	result: OnceCell<SearchResult>,
}

impl<M: Model> SearchPagination<M, SearchServerClient> {
	/// Fails with [`PaginationError::SearchDisabled`] when no search server
	/// is configured.
	pub fn new(
		model: Arc<M>,
		server: Option<(&str, u16)>,
		query: &str,
		index: &str,
		window: PageWindow,
	) -> Result<Self, PaginationError> {
		let (host, port) = server.ok_or(PaginationError::SearchDisabled)?;

		let mut client = SearchServerClient::new();
		client.set_server(host, port);

		Ok(Self::with_client(model, client, query, index, window))
	}
}

impl<M: Model, S: SearchClient> SearchPagination<M, S> {
	pub fn with_client(
		model: Arc<M>,
		client: S,
		query: &str,
		index: &str,
		window: PageWindow,
	) -> Self {
		Self {
			model,
			client,
			query: query.to_owned(),
			index: index.to_owned(),
			window,
			result: OnceCell::new(),
		}
	}

	/// The client, for setting filters before the query runs.
	pub fn client_mut(&mut self) -> &mut S {
		&mut self.client
	}

	pub fn query(&self) -> &str {
		&self.query
	}

	async fn run(&self, limits: Limits) -> Result<SearchResult, PaginationError> {
		self.client.query(&self.query, &self.index, limits).await
			.ok_or_else(|| PaginationError::Search(self.client.last_error()))
	}

	pub async fn result(&self) -> Result<&SearchResult, PaginationError> {
		self.result.get_or_try_init(|| {
			let limits = Limits {
				offset: self.window.offset(),
				limit: self.window.per_page(),
			};
			self.run(limits)
		}).await
	}
}

impl<M: Model, S: SearchClient + Clone> SearchPagination<M, S> {
	/// The same search over another window, with its own result.
	fn at(&self, window: PageWindow) -> Self {
		Self::with_client(Arc::clone(&self.model), self.client.clone(), &self.query, &self.index, window)
	}

	pub fn prev(&self) -> Result<Self, PaginationError> {
		Ok(self.at(self.window.prev()?))
	}

	pub fn next(&self) -> Result<Self, PaginationError> {
		Ok(self.at(self.window.next()?))
	}
}

#[async_trait::async_trait]
impl<M: Model, S: SearchClient> Paginate for SearchPagination<M, S> {
	type Item = M::Record;

	fn window(&self) -> PageWindow {
		self.window
	}

	async fn count(&self) -> Result<u64, PaginationError> {
		Ok(self.result().await?.total_found)
	}

	async fn items(&self) -> Result<Vec<M::Record>, PaginationError> {
		let ids = self.result().await?.ids();
		Ok(self.model.browse(&ids).await?)
	}

	async fn all_items(&self) -> Result<Vec<M::Record>, PaginationError> {
		let result = self.run(Limits { offset: 0, limit: ALL_ITEMS_LIMIT }).await?;
		Ok(self.model.browse(&result.ids()).await?)
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Mutex;

	use crate::database::memory::MemoryModel;
	use crate::database::Record;
	use crate::search::Match;

	use super::*;

	#[derive(Default, Clone)]
	struct FakeClient {
		queries: Arc<Mutex<Vec<Limits>>>,
		fail: bool,
	}

	impl FakeClient {
		fn queries(&self) -> Vec<Limits> {
			self.queries.lock().unwrap().clone()
		}
	}

	#[async_trait::async_trait]
	impl SearchClient for FakeClient {
		async fn query(&self, _: &str, _: &str, limits: Limits) -> Option<SearchResult> {
			self.queries.lock().unwrap().push(limits);
			if self.fail {
				return None;
			}

			let matches = (limits.offset + 1..=limits.offset + limits.limit.min(3))
				.map(|id| Match { id: id as i64, weight: 1.0 })
				.collect();
			Some(SearchResult { total_found: 57, matches })
		}

		fn last_error(&self) -> String {
			String::from("connection refused")
		}
	}

	fn pagination(client: FakeClient) -> SearchPagination<MemoryModel, FakeClient> {
		SearchPagination::with_client(
			Arc::new(MemoryModel::numbered(100)),
			client,
			"shoe",
			"products",
			PageWindow::new(3, 10).unwrap(),
		)
	}

	#[test]
	fn unconfigured_server_is_disabled() {
		let result = SearchPagination::new(
			Arc::new(MemoryModel::default()),
			None,
			"shoe",
			"products",
			PageWindow::new(1, 10).unwrap(),
		);
		assert!(matches!(result, Err(PaginationError::SearchDisabled)));
	}

	#[tokio::test]
	async fn queries_once_with_window_limits() {
		let pagination = pagination(FakeClient::default());

		assert_eq!(pagination.count().await.unwrap(), 57);
		let items = pagination.items().await.unwrap();
		assert_eq!(items.iter().map(Record::id).collect::<Vec<_>>(), vec![21, 22, 23]);
		pagination.summary().await.unwrap();

		assert_eq!(pagination.client.queries(), vec![Limits { offset: 20, limit: 10 }]);
	}

	#[tokio::test]
	async fn neighbours_query_their_own_window_once() {
		let pagination = pagination(FakeClient::default());
		pagination.count().await.unwrap();

		let next = pagination.next().unwrap();
		assert_eq!(next.window().page(), 4);
		assert_eq!(next.query(), "shoe");
		next.count().await.unwrap();
		next.items().await.unwrap();

		let prev = pagination.prev().unwrap();
		assert_eq!(prev.window().page(), 2);
		prev.items().await.unwrap();
		prev.summary().await.unwrap();

		assert_eq!(pagination.client.queries(), vec![
			Limits { offset: 20, limit: 10 },
			Limits { offset: 30, limit: 10 },
			Limits { offset: 10, limit: 10 },
		]);
		assert!(matches!(prev.prev().unwrap().prev(), Err(PaginationError::InvalidPage)));
	}

	#[tokio::test]
	async fn all_items_uses_server_maximum() {
		let pagination = pagination(FakeClient::default());
		pagination.all_items().await.unwrap();
		assert_eq!(pagination.client.queries(), vec![Limits { offset: 0, limit: ALL_ITEMS_LIMIT }]);
	}

	#[tokio::test]
	async fn failure_reports_last_error() {
		let pagination = pagination(FakeClient { fail: true, ..FakeClient::default() });
		match pagination.count().await {
			Err(PaginationError::Search(error)) => assert_eq!(error, "connection refused"),
			other => panic!("unexpected {:?}", other),
		}
	}
}

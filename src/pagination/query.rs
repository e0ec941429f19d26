use std::sync::Arc;

use sea_orm::{ConnectionTrait, DbErr, QueryResult, Statement};
use tokio::sync::OnceCell;

use crate::database::Model;

use super::{PageWindow, Paginate, PaginationError};

/// First column of a row as a record id or count.
///
/// Postgres hands back `int4` for most id columns and `int8` for
/// `count(*)`, so both widths are accepted.
pub(crate) fn first_column(row: &QueryResult) -> Result<i64, DbErr> {
	row.try_get_by_index::<i64>(0)
		.or_else(|_| row.try_get_by_index::<i32>(0).map(i64::from))
}

/// Pagination driven by hand-written SQL.
///
/// `search_query` selects record ids in its first column and must not carry
/// its own `LIMIT` or `OFFSET`. `count_query` returns the total in the first
/// column of its first row.
pub struct QueryPagination<M, C> {
	model: Arc<M>,
	connection: Arc<C>,
	search_query: String,
	count_query: String,
	window: PageWindow,
	count: OnceCell<u64>,
}

impl<M, C> QueryPagination<M, C>
where
	M: Model,
	C: ConnectionTrait + Send + Sync,
{
	pub fn new(
		model: Arc<M>,
		connection: Arc<C>,
		search_query: &str,
		count_query: &str,
		window: PageWindow,
	) -> Self {
		Self {
			model,
			connection,
			search_query: search_query.trim_end().trim_end_matches(';').to_owned(),
			count_query: count_query.to_owned(),
			window,
			count: OnceCell::new(),
		}
	}

	fn at(&self, window: PageWindow) -> Self {
		Self {
			model: Arc::clone(&self.model),
			connection: Arc::clone(&self.connection),
			search_query: self.search_query.clone(),
			count_query: self.count_query.clone(),
			window,
			count: self.count.get().copied().map(OnceCell::from).unwrap_or_default(),
		}
	}

	pub fn prev(&self) -> Result<Self, PaginationError> {
		Ok(self.at(self.window.prev()?))
	}

	pub fn next(&self) -> Result<Self, PaginationError> {
		Ok(self.at(self.window.next()?))
	}

	fn statement(&self, sql: String) -> Statement {
		Statement::from_string(self.connection.get_database_backend(), sql)
	}

	async fn ids(&self, sql: String) -> Result<Vec<i64>, DbErr> {
		self.connection.query_all(self.statement(sql)).await?
			.iter()
			.map(first_column)
			.collect()
	}
}

#[async_trait::async_trait]
impl<M, C> Paginate for QueryPagination<M, C>
where
	M: Model,
	C: ConnectionTrait + Send + Sync,
{
	type Item = M::Record;

	fn window(&self) -> PageWindow {
		self.window
	}

	async fn count(&self) -> Result<u64, PaginationError> {
		let count = self.count.get_or_try_init(|| async {
			let row = self.connection
				.query_one(self.statement(self.count_query.clone())).await?;

			match row {
				Some(row) => first_column(&row).map(|count| count.max(0) as u64),
				None => Ok(0),
			}
		}).await?;

		Ok(*count)
	}

	async fn items(&self) -> Result<Vec<M::Record>, PaginationError> {
		let sql = format!(
			"{} LIMIT {} OFFSET {}",
			self.search_query,
			self.window.per_page(),
			self.window.offset(),
		);
		let ids = self.ids(sql).await?;
		Ok(self.model.browse(&ids).await?)
	}

	async fn all_items(&self) -> Result<Vec<M::Record>, PaginationError> {
		let ids = self.ids(self.search_query.clone()).await?;
		Ok(self.model.browse(&ids).await?)
	}
}

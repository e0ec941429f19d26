//! Page windows over record sets, and the strategies that fill them.
//!
//! Every strategy pairs a [`PageWindow`] with some way of counting and
//! fetching records: an in-memory list, a [`Domain`](crate::database::Domain)
//! search, raw SQL, or an external full-text search server. Counts are
//! computed at most once per pagination object.

use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;
use warp::http::StatusCode;
use warp::{reject::Reject, Reply};

mod domain;
mod list;
mod query;
mod search;

pub use domain::Pagination;
pub use list::ListPagination;
pub use query::QueryPagination;
pub(crate) use query::first_column;
pub use search::{SearchPagination, ALL_ITEMS_LIMIT};

#[derive(Error, Debug)]
pub enum PaginationError {
	#[error("page numbers start at 1")]
	InvalidPage,
	#[error("pages must hold at least one item")]
	InvalidPerPage,
	#[error(transparent)]
	Database(#[from] DbErr),
	#[error("search server is not available or configured")]
	SearchDisabled,
	#[error("search failed: {0}")]
	Search(String),
}

impl Reject for PaginationError {}

impl From<&PaginationError> for StatusCode {
	fn from(error: &PaginationError) -> Self {
		match error {
			PaginationError::InvalidPage => StatusCode::BAD_REQUEST,
			PaginationError::InvalidPerPage => StatusCode::BAD_REQUEST,
			PaginationError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
			PaginationError::SearchDisabled => StatusCode::INTERNAL_SERVER_ERROR,
			PaginationError::Search(_) => StatusCode::BAD_GATEWAY,
		}
	}
}

impl Reply for PaginationError {
	fn into_response(self) -> warp::reply::Response {
		let status = StatusCode::from(&self);
		if status.is_server_error() {
			tracing::error!(error = %self, "pagination failed");
		}
		status.into_response()
	}
}

/// How many page numbers [`PageWindow::iter_pages`] shows around the
/// edges and around the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageEdges {
	pub left_edge: u64,
	pub left_current: u64,
	pub right_current: u64,
	pub right_edge: u64,
}

impl Default for PageEdges {
	fn default() -> Self {
		Self {
			left_edge: 2,
			left_current: 2,
			right_current: 2,
			right_edge: 2,
		}
	}
}

/// Offsets reach the database as signed 64-bit integers.
const MAX_OFFSET: u64 = i64::MAX as u64;

/// A 1-based page number and a page size.
///
/// The end of the window never passes [`i64::MAX`], so offsets and
/// neighbouring page numbers cannot overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
	page: u64,
	per_page: u64,
}

impl PageWindow {
	pub fn new(page: u64, per_page: u64) -> Result<Self, PaginationError> {
		if page == 0 {
			return Err(PaginationError::InvalidPage);
		}
		if per_page == 0 {
			return Err(PaginationError::InvalidPerPage);
		}
		match page.checked_mul(per_page) {
			Some(end) if end <= MAX_OFFSET => Ok(Self { page, per_page }),
			_ => Err(PaginationError::InvalidPage),
		}
	}

	pub fn page(&self) -> u64 {
		self.page
	}

	pub fn per_page(&self) -> u64 {
		self.per_page
	}

	pub fn offset(&self) -> u64 {
		(self.page - 1) * self.per_page
	}

	pub fn prev_num(&self) -> u64 {
		self.page - 1
	}

	pub fn has_prev(&self) -> bool {
		self.page > 1
	}

	pub fn next_num(&self) -> u64 {
		self.page + 1
	}

	pub fn has_next(&self, count: u64) -> bool {
		self.page < self.pages(count)
	}

	pub fn pages(&self, count: u64) -> u64 {
		count.div_ceil(self.per_page)
	}

	/// 1-based position of the first item on this page.
	pub fn begin_count(&self, count: u64) -> u64 {
		(self.offset() + 1).min(count)
	}

	/// 1-based position of the last item on this page.
	pub fn end_count(&self, count: u64) -> u64 {
		(self.begin_count(count) + self.per_page - 1).min(count)
	}

	pub fn prev(&self) -> Result<Self, PaginationError> {
		Self::new(self.prev_num(), self.per_page)
	}

	pub fn next(&self) -> Result<Self, PaginationError> {
		Self::new(self.next_num(), self.per_page)
	}

	/// Page numbers to link to, with `None` where numbers were skipped.
	///
	/// For page 5 of 10 with the default edges this gives
	/// `1 2 3 4 5 6 … 9 10`.
	pub fn iter_pages(
		&self,
		count: u64,
		edges: PageEdges,
	) -> impl Iterator<Item = Option<u64>> {
		let page = self.page;
		let pages = self.pages(count);
		let mut last = 0;

		(1..=pages)
			.filter(move |&number| {
				number <= edges.left_edge
					|| (number + edges.left_current + 1 > page
						&& number < page + edges.right_current)
					|| number + edges.right_edge > pages
			})
			.flat_map(move |number| {
				let skipped = last + 1 != number;
				last = number;
				skipped.then_some(None)
					.into_iter()
					.chain(Some(Some(number)))
			})
	}

	pub fn summary(&self, count: u64) -> PageSummary {
		PageSummary {
			page: self.page,
			per_page: self.per_page,
			count,
			pages: self.pages(count),
			begin_count: self.begin_count(count),
			end_count: self.end_count(count),
			has_prev: self.has_prev(),
			has_next: self.has_next(count),
			iter_pages: self.iter_pages(count, PageEdges::default()).collect(),
		}
	}
}

/// Everything a listing needs to render its page links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSummary {
	pub page: u64,
	pub per_page: u64,
	pub count: u64,
	pub pages: u64,
	pub begin_count: u64,
	pub end_count: u64,
	pub has_prev: bool,
	pub has_next: bool,
	pub iter_pages: Vec<Option<u64>>,
}

#[async_trait::async_trait]
pub trait Paginate: Send + Sync {
	type Item: Send;

	fn window(&self) -> PageWindow;

	async fn count(&self) -> Result<u64, PaginationError>;

	/// Items on the current page.
	async fn items(&self) -> Result<Vec<Self::Item>, PaginationError>;

	/// Every item, ignoring the window.
	async fn all_items(&self) -> Result<Vec<Self::Item>, PaginationError>;

	async fn summary(&self) -> Result<PageSummary, PaginationError> {
		let count = self.count().await?;
		Ok(self.window().summary(count))
	}
}

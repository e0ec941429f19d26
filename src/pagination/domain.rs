use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::database::{Domain, Model, Order, SearchOptions};

use super::{PageWindow, Paginate, PaginationError};

/// Pagination over the records of a model matching a domain.
///
/// A domain that is nothing but `id in [...]` (and no ordering) is served
/// straight from the id list without touching `search` or `search_count`.
pub struct Pagination<M> {
	model: Arc<M>,
	domain: Domain,
	order: Option<Order>,
	window: PageWindow,
	count: OnceCell<u64>,
}

impl<M: Model> Pagination<M> {
	pub fn new(model: Arc<M>, domain: Domain, window: PageWindow) -> Self {
		Self {
			model,
			domain,
			order: None,
			window,
			count: OnceCell::new(),
		}
	}

	pub fn ordered(mut self, order: Order) -> Self {
		self.order = Some(order);
		self
	}

	/// Use a count the caller already knows instead of asking the model.
	pub fn with_count(mut self, count: u64) -> Self {
		self.count = OnceCell::from(count);
		self
	}

	fn ids(&self) -> Option<&[i64]> {
		match self.order {
			Some(_) => None,
			None => self.domain.id_list(),
		}
	}

	fn at(&self, window: PageWindow) -> Self {
		let pagination = Self {
			model: Arc::clone(&self.model),
			domain: self.domain.clone(),
			order: self.order.clone(),
			window,
			count: OnceCell::new(),
		};

		match self.count.get() {
			Some(count) => pagination.with_count(*count),
			None => pagination,
		}
	}

	pub fn prev(&self) -> Result<Self, PaginationError> {
		Ok(self.at(self.window.prev()?))
	}

	pub fn next(&self) -> Result<Self, PaginationError> {
		Ok(self.at(self.window.next()?))
	}

	fn search_options(&self) -> SearchOptions {
		SearchOptions {
			offset: 0,
			limit: None,
			order: self.order.clone(),
		}
	}
}

#[async_trait::async_trait]
impl<M: Model> Paginate for Pagination<M> {
	type Item = M::Record;

	fn window(&self) -> PageWindow {
		self.window
	}

	async fn count(&self) -> Result<u64, PaginationError> {
		if let Some(ids) = self.ids() {
			return Ok(ids.len() as u64);
		}

		let count = self.count
			.get_or_try_init(|| self.model.search_count(&self.domain))
			.await?;
		Ok(*count)
	}

	async fn items(&self) -> Result<Vec<M::Record>, PaginationError> {
		let ids = match self.ids() {
			Some(ids) => {
				let start = (self.window.offset() as usize).min(ids.len());
				let end = start
					.saturating_add(self.window.per_page() as usize)
					.min(ids.len());
				ids[start..end].to_vec()
			},
			None => {
				let options = SearchOptions {
					offset: self.window.offset(),
					limit: Some(self.window.per_page()),
					..self.search_options()
				};
				self.model.search(&self.domain, &options).await?
			},
		};

		Ok(self.model.browse(&ids).await?)
	}

	async fn all_items(&self) -> Result<Vec<M::Record>, PaginationError> {
		let ids = match self.ids() {
			Some(ids) => ids.to_vec(),
			None => self.model.search(&self.domain, &self.search_options()).await?,
		};

		Ok(self.model.browse(&ids).await?)
	}
}

#[cfg(test)]
mod tests {
	use crate::database::memory::MemoryModel;
	use crate::database::{Direction, Operator, Record};

	use super::*;

	fn ids(records: &[crate::database::entities::product::Model]) -> Vec<i64> {
		records.iter().map(Record::id).collect()
	}

	#[tokio::test]
	async fn pages_through_domain() {
		let model = Arc::new(MemoryModel::numbered(25));
		let domain = Domain::new().and("id", Operator::Gt, 2);
		let pagination = Pagination::new(Arc::clone(&model), domain, PageWindow::new(2, 10).unwrap());

		assert_eq!(pagination.count().await.unwrap(), 23);
		assert_eq!(ids(&pagination.items().await.unwrap()), (13..=22).collect::<Vec<_>>());
		assert_eq!(pagination.all_items().await.unwrap().len(), 23);
	}

	#[tokio::test]
	async fn count_is_cached() {
		let model = Arc::new(MemoryModel::numbered(5));
		let pagination = Pagination::new(Arc::clone(&model), Domain::new(), PageWindow::new(1, 2).unwrap());

		pagination.count().await.unwrap();
		pagination.summary().await.unwrap();
		assert_eq!(model.counts(), 1);

		// the count carries over to neighbouring pages
		pagination.next().unwrap().count().await.unwrap();
		assert_eq!(model.counts(), 1);
	}

	#[tokio::test]
	async fn precomputed_count_skips_query() {
		let model = Arc::new(MemoryModel::numbered(5));
		let pagination = Pagination::new(Arc::clone(&model), Domain::new(), PageWindow::new(1, 2).unwrap())
			.with_count(40);

		assert_eq!(pagination.count().await.unwrap(), 40);
		assert_eq!(model.counts(), 0);
	}

	#[tokio::test]
	async fn id_list_skips_search() {
		let model = Arc::new(MemoryModel::numbered(10));
		let domain = Domain::ids(vec![9, 2, 7, 4, 5]);
		let pagination = Pagination::new(Arc::clone(&model), domain, PageWindow::new(2, 2).unwrap());

		assert_eq!(pagination.count().await.unwrap(), 5);
		assert_eq!(ids(&pagination.items().await.unwrap()), vec![7, 4]);
		assert_eq!(ids(&pagination.all_items().await.unwrap()), vec![9, 2, 7, 4, 5]);
		assert_eq!(model.searches(), 0);
		assert_eq!(model.counts(), 0);
	}

	#[tokio::test]
	async fn ordered_id_list_is_searched() {
		let model = Arc::new(MemoryModel::numbered(10));
		let domain = Domain::ids(vec![2, 9, 4]);
		let pagination = Pagination::new(Arc::clone(&model), domain, PageWindow::new(1, 10).unwrap())
			.ordered(Order::by("id", Direction::Descending));

		assert_eq!(ids(&pagination.items().await.unwrap()), vec![9, 4, 2]);
		assert_eq!(model.searches(), 1);
	}
}

use super::{PageWindow, Paginate, PaginationError};

/// Pagination over items already in memory.
#[derive(Debug, Clone)]
pub struct ListPagination<T> {
	data: Vec<T>,
	window: PageWindow,
}

impl<T: Clone + Send + Sync> ListPagination<T> {
	pub fn new(data: Vec<T>, window: PageWindow) -> Self {
		Self { data, window }
	}

	pub fn prev(&self) -> Result<Self, PaginationError> {
		Ok(Self::new(self.data.clone(), self.window.prev()?))
	}

	pub fn next(&self) -> Result<Self, PaginationError> {
		Ok(Self::new(self.data.clone(), self.window.next()?))
	}

	fn page(&self) -> &[T] {
		let len = self.data.len();
		let start = usize::try_from(self.window.offset()).map_or(len, |offset| offset.min(len));
		let per_page = usize::try_from(self.window.per_page()).unwrap_or(usize::MAX);
		let end = start.saturating_add(per_page).min(len);
		&self.data[start..end]
	}
}

#[async_trait::async_trait]
impl<T: Clone + Send + Sync> Paginate for ListPagination<T> {
	type Item = T;

	fn window(&self) -> PageWindow {
		self.window
	}

	async fn count(&self) -> Result<u64, PaginationError> {
		Ok(self.data.len() as u64)
	}

	async fn items(&self) -> Result<Vec<T>, PaginationError> {
		Ok(self.page().to_vec())
	}

	async fn all_items(&self) -> Result<Vec<T>, PaginationError> {
		Ok(self.data.clone())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn letters(page: u64) -> ListPagination<char> {
		let window = PageWindow::new(page, 3).unwrap();
		ListPagination::new("abcdefgh".chars().collect(), window)
	}

	#[tokio::test]
	async fn slices_the_list() {
		assert_eq!(letters(1).items().await.unwrap(), vec!['a', 'b', 'c']);
		assert_eq!(letters(3).items().await.unwrap(), vec!['g', 'h']);
		assert!(letters(4).items().await.unwrap().is_empty());
		assert_eq!(letters(4).all_items().await.unwrap().len(), 8);
	}

	#[tokio::test]
	async fn walks_between_pages() {
		let second = letters(1).next().unwrap();
		assert_eq!(second.items().await.unwrap(), vec!['d', 'e', 'f']);
		assert_eq!(second.prev().unwrap().window().page(), 1);
		assert!(letters(1).prev().is_err());

		let summary = second.summary().await.unwrap();
		assert_eq!(summary.count, 8);
		assert_eq!(summary.pages, 3);
		assert_eq!((summary.begin_count, summary.end_count), (4, 6));
		assert!(summary.has_prev && summary.has_next);
	}
}

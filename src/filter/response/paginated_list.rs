use serde::{Deserialize, Serialize, Serializer};
use warp::http::{StatusCode, Uri};
use warp::Reply;

use crate::pagination::{PageSummary, PageWindow, Paginate, PaginationError};
use crate::urls::UrlBuilder;

fn optional_uri<S>(uri: &Option<Uri>, ser: S) -> Result<S::Ok, S::Error>
where S: Serializer {
	if let Some(uri) = uri {
		http_serde::uri::serialize(uri, ser)
	} else {
		ser.serialize_none()
	}
}

#[serde_with::skip_serializing_none]
#[derive(Serialize, Debug)]
pub struct Page<T: Serialize> {
	pub items: Vec<T>,
	#[serde(flatten)]
	pub summary: PageSummary,
	#[serde(serialize_with = "optional_uri")]
	pub next: Option<Uri>,
	#[serde(serialize_with = "optional_uri")]
	pub previous: Option<Uri>,
}

#[derive(Deserialize, Debug, Default)]
pub struct PaginationOptions {
	pub page: Option<u64>,
	pub per_page: Option<u64>,
}

pub const DEFAULT_PAGE_ITEM_LIMIT: u64 = 10;
pub const MAX_PAGE_ITEM_LIMIT: u64 = 100;

impl PaginationOptions {
	pub fn window(&self) -> Result<PageWindow, PaginationError> {
		let per_page = self.per_page
			.unwrap_or(DEFAULT_PAGE_ITEM_LIMIT)
			.min(MAX_PAGE_ITEM_LIMIT);
		PageWindow::new(self.page.unwrap_or(1), per_page)
	}
}

/// Where the neighbouring pages of a listing live.
pub struct PageLinks<'a> {
	pub urls: &'a UrlBuilder,
	pub endpoint: &'a str,
	pub values: Vec<(&'a str, String)>,
}

impl PageLinks<'_> {
	fn link(&self, window: PageWindow) -> Result<Uri, warp::reply::Response> {
		let values = self.values.iter()
			.map(|(key, value)| (*key, value.clone()))
			.chain([
				("page", window.page().to_string()),
				("per_page", window.per_page().to_string()),
			]);

		self.urls.url_for(self.endpoint, values)
			.map_err(Reply::into_response)?
			.parse::<Uri>()
			.map_err(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
	}
}

/// Load the current page of `pagination` with links to its neighbours.
pub async fn page<P>(
	pagination: &P,
	links: &PageLinks<'_>,
) -> Result<Page<P::Item>, warp::reply::Response>
where
	P: Paginate,
	P::Item: Serialize,
{
	let summary = pagination.summary().await
		.map_err(Reply::into_response)?;
	let items = pagination.items().await
		.map_err(Reply::into_response)?;

	let window = pagination.window();
	let next = match window.next() {
		Ok(next) if summary.has_next => Some(links.link(next)?),
		_ => None,
	};
	let previous = match window.prev() {
		Ok(prev) => Some(links.link(prev)?),
		Err(_) => None,
	};

	Ok(Page { items, summary, next, previous })
}

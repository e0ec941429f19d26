use std::sync::Arc;

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::Serialize;
use warp::{Filter, Rejection, Reply};

use crate::crumbs::{make_crumbs, Crumb, CrumbNode, CrumbOptions};
use crate::database::entities::{category, product};
use crate::database::Connection;
use crate::filter::request::RequestContext;
use crate::filter::resource::database;
use crate::filter::response::paginated_list::{self, Page, PageLinks, PaginationOptions};
use crate::pagination::QueryPagination;

use super::products::product_model;
use super::{database_error, language, not_found, Shop};

const RENDER_ENDPOINT: &str = "product.category.render";

/// A category together with the connection its parents are loaded from.
pub struct CategoryNode {
	pub category: category::Model,
	connection: Connection,
}

impl CategoryNode {
	pub fn new(category: category::Model, connection: Connection) -> Self {
		Self { category, connection }
	}
}

#[async_trait::async_trait]
impl CrumbNode for CategoryNode {
	fn id(&self) -> i64 {
		self.category.id.into()
	}

	fn uri(&self) -> &str {
		&self.category.uri
	}

	fn title(&self) -> &str {
		&self.category.title
	}

	async fn parent(&self) -> Option<Self> {
		let id = self.category.parent?;

		match category::Entity::find_by_id(id).one(self.connection.as_ref()).await {
			Ok(parent) => parent.map(|category| Self::new(category, Arc::clone(&self.connection))),
			Err(error) => {
				tracing::warn!(%error, category = id, "failed to load parent category");
				None
			},
		}
	}
}

fn products_query(category: i32) -> (String, String) {
	let search = format!(
		"SELECT id FROM product WHERE category = {} AND displayed_on_eshop ORDER BY name, id",
		category,
	);
	let count = format!(
		"SELECT COUNT(*) FROM product WHERE category = {} AND displayed_on_eshop",
		category,
	);
	(search, count)
}

#[derive(Serialize, Debug)]
struct CategoryPage {
	category: category::Model,
	crumbs: Vec<Crumb>,
	products: Page<product::Model>,
}

pub fn render(shop: &Shop) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
	language(shop.config)
		.and(warp::path("category"))
		.and(warp::path::param())
		.and(warp::path::end())
		.and(warp::get())
		.and(warp::query())
		.and(shop.context())
		.and(database::connection(Arc::clone(&shop.database)))
		.then(|uri: String, options: PaginationOptions, ctx: RequestContext, connection: Connection| async move {
			let window = options.window()
				.map_err(Reply::into_response)?;

			let category = category::Entity::find()
				.filter(category::Column::Uri.eq(uri.as_str()))
				.filter(category::Column::DisplayedOnEshop.eq(true))
				.one(connection.as_ref()).await
				.map_err(database_error)?
				.ok_or_else(not_found)?;

			let node = CategoryNode::new(category.clone(), Arc::clone(&connection));
			let crumbs = make_crumbs(node, RENDER_ENDPOINT, &ctx.urls, &CrumbOptions::default()).await
				.map_err(Reply::into_response)?;

			let (search, count) = products_query(category.id);
			let pagination = QueryPagination::new(
				product_model(Arc::clone(&connection)),
				connection,
				&search,
				&count,
				window,
			);
			let links = PageLinks {
				urls: &ctx.urls,
				endpoint: RENDER_ENDPOINT,
				values: vec![("uri", uri)],
			};
			let products = paginated_list::page(&pagination, &links).await?;

			let page = CategoryPage { category, crumbs, products };
			Ok::<_, warp::reply::Response>(ctx.finish(warp::reply::json(&page)))
		})
}

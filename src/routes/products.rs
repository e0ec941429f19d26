use std::sync::Arc;

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use warp::{Filter, Rejection, Reply};

use crate::database::entities::product;
use crate::database::{Connection, Direction, Domain, EntityModel, Operator, Order};
use crate::filter::request::RequestContext;
use crate::filter::resource::database;
use crate::filter::response::paginated_list::{self, PageLinks, PaginationOptions};
use crate::pagination::{Pagination, SearchPagination};
use crate::sitemap::SitemapModel;
use crate::urls::{BuildError, UrlBuilder, UrlOptions};

use super::{database_error, language, not_found, Shop};

pub type ProductModel = EntityModel<product::Entity>;

pub const PRODUCT_MODEL: &str = "product.product";
pub const SEARCH_INDEX: &str = "products";
const RENDER_ENDPOINT: &str = "product.product.render";

impl SitemapModel for ProductModel {
	fn absolute_url(
		&self,
		urls: &UrlBuilder,
		record: &product::Model,
	) -> Result<String, BuildError> {
		urls.build(RENDER_ENDPOINT, [("uri", record.uri.as_str())], &UrlOptions::external())
	}
}

pub fn product_model(connection: Connection) -> Arc<ProductModel> {
	Arc::new(ProductModel::new(connection, PRODUCT_MODEL))
}

/// Products shown in the shop.
pub fn displayed() -> Domain {
	Domain::new().and("displayed_on_eshop", Operator::Eq, true)
}

pub fn list(shop: &Shop) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
	language(shop.config)
		.and(warp::path("products"))
		.and(warp::path::end())
		.and(warp::get())
		.and(warp::query())
		.and(shop.context())
		.and(database::connection(Arc::clone(&shop.database)))
		.then(|options: PaginationOptions, ctx: RequestContext, connection: Connection| async move {
			let window = options.window()
				.map_err(Reply::into_response)?;

			let order = Order::by("name", Direction::Ascending)
				.then("id", Direction::Ascending);
			let pagination = Pagination::new(product_model(connection), displayed(), window)
				.ordered(order);

			let links = PageLinks {
				urls: &ctx.urls,
				endpoint: "product.product.list",
				values: vec![],
			};
			let page = paginated_list::page(&pagination, &links).await?;

			Ok::<_, warp::reply::Response>(ctx.finish(warp::reply::json(&page)))
		})
}

#[derive(Deserialize, Debug)]
struct SearchQuery {
	q: String,
	category: Option<i64>,
	page: Option<u64>,
	per_page: Option<u64>,
}

pub fn search(shop: &Shop) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
	let config = shop.config;

	language(config)
		.and(warp::path("products"))
		.and(warp::path("search"))
		.and(warp::path::end())
		.and(warp::get())
		.and(warp::query())
		.and(shop.context())
		.and(database::connection(Arc::clone(&shop.database)))
		.then(move |query: SearchQuery, ctx: RequestContext, connection: Connection| async move {
			let options = PaginationOptions { page: query.page, per_page: query.per_page };
			let window = options.window()
				.map_err(Reply::into_response)?;

			let mut pagination = SearchPagination::new(
				product_model(connection),
				config.search_address(),
				&query.q,
				SEARCH_INDEX,
				window,
			).map_err(Reply::into_response)?;

			let mut values = vec![("q", query.q.clone())];
			if let Some(category) = query.category {
				pagination.client_mut().set_filter("category", vec![category]);
				values.push(("category", category.to_string()));
			}

			let links = PageLinks {
				urls: &ctx.urls,
				endpoint: "product.product.search",
				values,
			};
			let page = paginated_list::page(&pagination, &links).await?;

			Ok::<_, warp::reply::Response>(ctx.finish(warp::reply::json(&page)))
		})
}

#[derive(Serialize, Debug)]
struct ProductPage {
	#[serde(flatten)]
	product: product::Model,
	url: String,
}

pub fn render(shop: &Shop) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
	language(shop.config)
		.and(warp::path("product"))
		.and(warp::path::param())
		.and(warp::path::end())
		.and(warp::get())
		.and(shop.context())
		.and(database::connection(Arc::clone(&shop.database)))
		.then(|uri: String, ctx: RequestContext, connection: Connection| async move {
			let product = product::Entity::find()
				.filter(product::Column::Uri.eq(uri))
				.filter(product::Column::DisplayedOnEshop.eq(true))
				.one(connection.as_ref()).await
				.map_err(database_error)?
				.ok_or_else(not_found)?;

			let url = product_model(connection)
				.absolute_url(&ctx.urls, &product)
				.map_err(Reply::into_response)?;

			let page = ProductPage { product, url };
			Ok::<_, warp::reply::Response>(ctx.finish(warp::reply::json(&page)))
		})
}

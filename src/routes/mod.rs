use std::sync::Arc;

use sea_orm::DbErr;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::config::Config;
use crate::database::ShopDatabase;
use crate::filter::request::{self, InvalidRequestUrl, RequestContext};
use crate::filter::resource::database::DbConnectionFailed;
use crate::filter::response::redirect::{self, InvalidLocation};
use crate::files::FileSettings;
use crate::session::SessionStore;
use crate::urls::{BuildError, UrlMap};

pub mod categories;
pub mod products;
pub mod sitemaps;
pub mod static_files;
pub mod website;

pub fn url_map() -> UrlMap {
	UrlMap::new()
		.rule("website.home", "/<language>/")
		.rule("website.login", "/<language>/login")
		.rule("website.logout", "/<language>/logout")
		.rule("website.account", "/<language>/account")
		.rule("product.product.list", "/<language>/products")
		.rule("product.product.search", "/<language>/products/search")
		.rule("product.product.render", "/<language>/product/<uri>")
		.rule("product.category.render", "/<language>/category/<uri>")
		.rule("product.product.sitemap_index", "/sitemaps/product/index.xml")
		.rule("product.product.sitemap", "/sitemaps/product/<page>.xml")
		.rule("static", "/static/<filename>")
}

/// Shared state every route is built from.
#[derive(Clone)]
pub struct Shop {
	pub config: &'static Config,
	pub urls: Arc<UrlMap>,
	pub sessions: Arc<SessionStore>,
	pub database: Arc<ShopDatabase>,
}

impl Shop {
	pub fn new(config: &'static Config, database: ShopDatabase) -> Self {
		Self {
			config,
			urls: Arc::new(url_map()),
			sessions: Arc::new(SessionStore::new()),
			database: Arc::new(database),
		}
	}

	pub fn context(&self) -> impl Filter<Extract = (RequestContext,), Error = Rejection> + Clone {
		request::context(self.config, Arc::clone(&self.urls), Arc::clone(&self.sessions))
	}

	pub fn file_settings(&self) -> FileSettings {
		FileSettings::from(self.config)
	}
}

/// Match a leading path segment naming one of the configured languages.
pub fn language(config: &'static Config) -> impl Filter<Extract = (), Error = Rejection> + Clone {
	warp::path::param::<String>()
		.and_then(move |language: String| async move {
			if config.is_language(&language) {
				Ok(())
			} else {
				Err(warp::reject::not_found())
			}
		})
		.untuple_one()
}

pub(crate) fn database_error(error: DbErr) -> warp::reply::Response {
	tracing::error!(%error, "database query failed");
	StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

pub(crate) fn not_found() -> warp::reply::Response {
	StatusCode::NOT_FOUND.into_response()
}

pub fn routes(shop: &Shop) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
	website::home(shop)
		.or(website::login_form(shop))
		.or(website::login(shop))
		.or(website::logout(shop))
		.or(website::account(shop))
		.or(products::list(shop))
		.or(products::search(shop))
		.or(products::render(shop))
		.or(categories::render(shop))
		.or(sitemaps::index(shop))
		.or(sitemaps::section(shop))
		.or(static_files::get(shop))
}

/// Responses for the rejections routes raise themselves.
pub async fn recover(rejection: Rejection) -> Result<warp::reply::Response, Rejection> {
	let rejection = match redirect::recover(rejection).await {
		Ok(response) => return Ok(response),
		Err(rejection) => rejection,
	};

	if let Some(error) = rejection.find::<BuildError>() {
		tracing::error!(%error, "url build failed");
		Ok(StatusCode::INTERNAL_SERVER_ERROR.into_response())
	} else if rejection.find::<InvalidRequestUrl>().is_some() {
		Ok(InvalidRequestUrl.into_response())
	} else if rejection.find::<DbConnectionFailed>().is_some() {
		Ok(DbConnectionFailed.into_response())
	} else if let Some(InvalidLocation(location)) = rejection.find::<InvalidLocation>() {
		tracing::error!(%location, "invalid redirect location");
		Ok(StatusCode::INTERNAL_SERVER_ERROR.into_response())
	} else {
		Err(rejection)
	}
}

#[cfg(test)]
pub(crate) fn test_shop() -> Shop {
	use sea_orm::{DatabaseBackend, MockDatabase};

	test_shop_with(MockDatabase::new(DatabaseBackend::Postgres))
}

#[cfg(test)]
pub(crate) fn test_shop_with(database: sea_orm::MockDatabase) -> Shop {
	Shop::new(request::test_config(), ShopDatabase::from_connection(database.into_connection()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn unknown_language_is_not_found() {
		let filter = language(request::test_config()).map(|| "ok");

		let matched = warp::test::request().path("/de_DE").filter(&filter).await;
		assert!(matched.is_ok());

		let missing = warp::test::request().path("/xx_XX").filter(&filter).await;
		assert!(missing.is_err());
	}

	#[test]
	fn every_route_has_a_rule() {
		let urls = crate::urls::UrlBuilder::new(
			Arc::new(url_map()),
			url::Url::parse("http://shop.example.com/").unwrap(),
			String::from("en_US"),
		);

		assert_eq!(urls.url_for("product.product.list", [("page", 2)]).unwrap(), "/en_US/products?page=2");
		assert_eq!(urls.url_for("static", [("filename", "site.css")]).unwrap(), "/static/site.css?language=en_US");
	}
}

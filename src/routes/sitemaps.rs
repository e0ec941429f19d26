use std::sync::Arc;

use warp::{Filter, Rejection, Reply};

use crate::database::Connection;
use crate::filter::header::conditional::{self, Conditions};
use crate::filter::request::RequestContext;
use crate::filter::resource::database;
use crate::sitemap::{Changefreq, SitemapIndex, SitemapSection};

use super::products::{displayed, product_model};
use super::{not_found, Shop};

/// Page number of a section file name such as `3.xml`.
fn section_page(file: &str) -> Option<u64> {
	file.strip_suffix(".xml")?
		.parse::<u64>()
		.ok()
		.filter(|page| *page > 0)
}

pub fn index(shop: &Shop) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
	let settings = shop.file_settings();

	warp::path!("sitemaps" / "product" / "index.xml")
		.and(warp::get())
		.and(conditional::conditions())
		.and(shop.context())
		.and(database::connection(Arc::clone(&shop.database)))
		.then(move |conditions: Conditions, ctx: RequestContext, connection: Connection| {
			let settings = settings.clone();
			async move {
				let model = product_model(connection);
				let index = SitemapIndex::new(model.as_ref(), &ctx.urls);

				let response = index.render(&settings, &conditions).await;
				response.map_err(Reply::into_response)
			}
		})
}

pub fn section(shop: &Shop) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
	let settings = shop.file_settings();

	warp::path!("sitemaps" / "product" / String)
		.and(warp::get())
		.and(conditional::conditions())
		.and(shop.context())
		.and(database::connection(Arc::clone(&shop.database)))
		.then(move |file: String, conditions: Conditions, ctx: RequestContext, connection: Connection| {
			let settings = settings.clone();
			async move {
				let page = section_page(&file).ok_or_else(not_found)?;
				let model = product_model(connection);

				let section = SitemapSection::new(model.as_ref(), &ctx.urls, displayed(), page)
					.map_err(Reply::into_response)?
					.changefreq(Changefreq::Weekly);

				let response = section.render(&settings, &conditions).await;
				response.map_err(Reply::into_response)
			}
		})
}

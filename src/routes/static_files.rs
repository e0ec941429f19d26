use warp::path::Tail;
use warp::{Filter, Rejection, Reply};

use crate::files::{send_from_directory, SendFileOptions};
use crate::filter::header::conditional::{self, Conditions};

use super::Shop;

pub fn get(shop: &Shop) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
	let folder = shop.config.static_folder.clone();
	let settings = shop.file_settings();

	warp::path("static")
		.and(warp::path::tail())
		.and(warp::get())
		.and(conditional::conditions())
		.then(move |tail: Tail, conditions: Conditions| {
			let folder = folder.clone();
			let settings = settings.clone();
			async move {
				send_from_directory(&folder, tail.as_str(), SendFileOptions::default(), &settings, &conditions).await
					.map_err(Reply::into_response)
			}
		})
}

use std::sync::Arc;

use warp::http::StatusCode;
use warp::{reject, Filter, Rejection, Reply};

use crate::database::Database;

#[derive(Debug)]
pub struct DbConnectionFailed;

impl reject::Reject for DbConnectionFailed {}

impl Reply for DbConnectionFailed {
	fn into_response(self) -> warp::reply::Response {
		StatusCode::SERVICE_UNAVAILABLE.into_response()
	}
}

pub fn connection<T: Database>(
	db: Arc<T>,
) -> impl Filter<Extract = (T::Connection,), Error = Rejection> + Clone {
	warp::any().and_then(move || {
		let db = Arc::clone(&db);
		async move {
			db.connection().await
				.map_err(|error| {
					tracing::error!(?error, "no database connection");
					DbConnectionFailed
				})
				.map_err(reject::custom)
		}
	})
}

use warp::http::{header, StatusCode, Uri};
use warp::hyper::{Body, Response};
use warp::{reject::Reject, Rejection, Reply};

/// A rejection that ends the request with a `302 Found`.
#[derive(Debug)]
pub struct Redirect(pub Uri);

impl Reject for Redirect {}

impl Reply for Redirect {
	fn into_response(self) -> warp::reply::Response {
		Response::builder()
			.status(StatusCode::FOUND)
			.header(header::LOCATION, self.0.to_string())
			.body(Body::empty())
			.unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
	}
}

pub fn to(location: &str) -> Result<Redirect, Rejection> {
	location.parse::<Uri>()
		.map(Redirect)
		.map_err(|_| warp::reject::custom(InvalidLocation(location.to_owned())))
}

#[derive(Debug)]
pub struct InvalidLocation(pub String);

impl Reject for InvalidLocation {}

/// Turn redirect rejections into responses, passing everything else on.
pub async fn recover(rejection: Rejection) -> Result<warp::reply::Response, Rejection> {
	if let Some(Redirect(uri)) = rejection.find::<Redirect>() {
		Ok(Redirect(uri.clone()).into_response())
	} else {
		Err(rejection)
	}
}

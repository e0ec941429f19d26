//! Gates that redirect instead of serving.
//!
//! Both are meant to be chained after [`request::context`] with
//! `and_then`:
//!
//! ```ignore
//! request::context(config, urls, sessions)
//! 	.and_then(auth::secure)
//! 	.and_then(auth::login_required)
//! ```
//!
//! [`request::context`]: super::request::context

use warp::Rejection;

use super::request::RequestContext;
use super::response::redirect;

pub const LOGIN_ENDPOINT: &str = "website.login";

/// Redirect plain http requests to the same url over https.
pub async fn secure(ctx: RequestContext) -> Result<RequestContext, Rejection> {
	if ctx.is_secure() {
		return Ok(ctx);
	}

	let location = ctx.url().as_str().replacen("http://", "https://", 1);
	tracing::debug!(%location, "redirecting to https");
	Err(warp::reject::custom(redirect::to(&location)?))
}

/// Redirect to the login page unless the session has a user.
///
/// The current url is passed along as `next`.
pub async fn login_required(ctx: RequestContext) -> Result<RequestContext, Rejection> {
	if ctx.session.user().await.is_some() {
		return Ok(ctx);
	}

	let login = ctx.urls
		.url_for(LOGIN_ENDPOINT, [("next", ctx.url().as_str())])
		.map_err(warp::reject::custom)?;
	Err(warp::reject::custom(redirect::to(&login)?))
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use warp::http::{header, StatusCode};
	use warp::{Filter, Reply};

	use super::*;
	use crate::filter::request::{context, test_config};
	use crate::session::{SessionStore, SESSION_COOKIE};
	use crate::urls::UrlMap;

	fn account(
		sessions: Arc<SessionStore>,
	) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
		let map = UrlMap::new().rule(LOGIN_ENDPOINT, "/<language>/login");
		context(test_config(), Arc::new(map), sessions)
			.and_then(secure)
			.and_then(login_required)
			.map(|_ctx: RequestContext| "account")
			.recover(redirect::recover)
	}

	#[tokio::test]
	async fn plain_http_goes_to_https() {
		let response = warp::test::request()
			.path("/en_US/account?tab=orders")
			.header("host", "shop.example.com")
			.reply(&account(Arc::new(SessionStore::new())))
			.await;

		assert_eq!(response.status(), StatusCode::FOUND);
		assert_eq!(
			response.headers()[header::LOCATION],
			"https://shop.example.com/en_US/account?tab=orders",
		);
	}

	#[tokio::test]
	async fn anonymous_goes_to_login() {
		let response = warp::test::request()
			.path("/en_US/account")
			.header("host", "shop.example.com")
			.header("x-forwarded-proto", "https")
			.reply(&account(Arc::new(SessionStore::new())))
			.await;

		assert_eq!(response.status(), StatusCode::FOUND);
		assert_eq!(
			response.headers()[header::LOCATION],
			"/en_US/login?next=https%3A%2F%2Fshop.example.com%2Fen_US%2Faccount",
		);
	}

	#[tokio::test]
	async fn logged_in_passes() {
		let sessions = Arc::new(SessionStore::new());
		let session = sessions.load(None).await;
		session.set_user(Some(1)).await;

		let response = warp::test::request()
			.path("/en_US/account")
			.header("host", "shop.example.com")
			.header("x-forwarded-proto", "https")
			.header("cookie", format!("{}={}", SESSION_COOKIE, session.id()).as_str())
			.reply(&account(sessions))
			.await;

		assert_eq!(response.status(), StatusCode::OK);
		assert_eq!(response.body().as_ref(), b"account");
	}
}

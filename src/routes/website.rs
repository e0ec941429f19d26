use serde::{Deserialize, Serialize};
use url::Url;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::filter::auth;
use crate::filter::request::RequestContext;
use crate::filter::response::redirect;
use crate::session::Flash;

use super::{language, Shop};

const HOME: &str = "website.home";
const NO_VALUES: [(&str, &str); 0] = [];

#[derive(Serialize, Debug)]
struct HomePage<'a> {
	language: &'a str,
	user: Option<i64>,
	flashes: &'a [Flash],
}

pub fn home(shop: &Shop) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
	language(shop.config)
		.and(warp::path::end())
		.and(warp::get())
		.and(shop.context())
		.then(|ctx: RequestContext| async move {
			let page = HomePage {
				language: ctx.language(),
				user: ctx.session.user().await,
				flashes: ctx.flashes().await,
			};
			ctx.finish(warp::reply::json(&page))
		})
}

#[derive(Deserialize, Debug)]
struct NextQuery {
	next: Option<String>,
}

#[derive(Serialize, Debug)]
struct LoginPage<'a> {
	next: Option<String>,
	flashes: &'a [Flash],
}

pub fn login_form(shop: &Shop) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
	language(shop.config)
		.and(warp::path("login"))
		.and(warp::path::end())
		.and(warp::get())
		.and(warp::query::<NextQuery>())
		.and(shop.context())
		.then(|query: NextQuery, ctx: RequestContext| async move {
			let page = LoginPage {
				next: query.next,
				flashes: ctx.flashes().await,
			};
			ctx.finish(warp::reply::json(&page))
		})
}

#[derive(Deserialize, Debug)]
struct LoginForm {
	user: i64,
	next: Option<String>,
}

/// `next` if it points back into this site, else the home page.
fn after_login(ctx: &RequestContext, next: Option<&str>) -> Result<String, warp::reply::Response> {
	let same_site = next
		.and_then(|next| ctx.url().join(next).ok())
		.filter(|target: &Url| target.origin() == ctx.url().origin());

	match same_site {
		Some(target) => Ok(target.to_string()),
		None => ctx.urls.url_for(HOME, NO_VALUES).map_err(Reply::into_response),
	}
}

fn redirect_to(ctx: &RequestContext, location: &str) -> warp::reply::Response {
	match redirect::to(location) {
		Ok(redirect) => ctx.finish(redirect),
		Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
	}
}

pub fn login(shop: &Shop) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
	language(shop.config)
		.and(warp::path("login"))
		.and(warp::path::end())
		.and(warp::post())
		.and(warp::body::form::<LoginForm>())
		.and(shop.context())
		.then(|form: LoginForm, ctx: RequestContext| async move {
			let location = after_login(&ctx, form.next.as_deref())?;

			ctx.session.set_user(Some(form.user)).await;
			ctx.session.flash("You are now logged in.", Some("info")).await;
			tracing::info!(user = form.user, "logged in");

			Ok::<_, warp::reply::Response>(redirect_to(&ctx, &location))
		})
}

pub fn logout(shop: &Shop) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
	language(shop.config)
		.and(warp::path("logout"))
		.and(warp::path::end())
		.and(warp::get())
		.and(shop.context())
		.then(|mut ctx: RequestContext| async move {
			let location = ctx.urls.url_for(HOME, NO_VALUES)
				.map_err(Reply::into_response)?;

			ctx.session = ctx.session.renew().await;
			ctx.session.flash("You have been logged out.", None).await;

			Ok::<_, warp::reply::Response>(redirect_to(&ctx, &location))
		})
}

#[derive(Serialize, Debug)]
struct AccountPage<'a> {
	user: Option<i64>,
	flashes: &'a [Flash],
}

pub fn account(shop: &Shop) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
	language(shop.config)
		.and(warp::path("account"))
		.and(warp::path::end())
		.and(warp::get())
		.and(shop.context())
		.and_then(auth::secure)
		.and_then(auth::login_required)
		.then(|ctx: RequestContext| async move {
			let page = AccountPage {
				user: ctx.session.user().await,
				flashes: ctx.flashes().await,
			};
			ctx.finish(warp::reply::json(&page))
		})
}

#[cfg(test)]
mod tests {
	use warp::http::header;

	use crate::routes::{recover, test_shop};
	use crate::session::SESSION_COOKIE;

	use super::*;

	fn cookie(response: &warp::http::Response<warp::hyper::body::Bytes>) -> String {
		let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
		set_cookie.split(';').next().unwrap().to_owned()
	}

	#[tokio::test]
	async fn login_flashes_and_redirects() {
		let shop = test_shop();
		let filter = login(&shop).or(home(&shop));

		let response = warp::test::request()
			.method("POST")
			.path("/en_US/login")
			.header("host", "shop.example.com")
			.header("content-type", "application/x-www-form-urlencoded")
			.body("user=7&next=%2Fen_US%2Faccount")
			.reply(&filter)
			.await;

		assert_eq!(response.status(), StatusCode::FOUND);
		assert_eq!(response.headers()[header::LOCATION], "http://shop.example.com/en_US/account");

		let cookie = cookie(&response);
		assert!(cookie.starts_with(SESSION_COOKIE));

		let home = warp::test::request()
			.path("/en_US/")
			.header("host", "shop.example.com")
			.header("cookie", cookie.as_str())
			.reply(&filter)
			.await;
		let page: serde_json::Value = serde_json::from_slice(home.body()).unwrap();
		assert_eq!(page["user"], 7);
		assert_eq!(page["flashes"][0]["message"], "You are now logged in.");
		assert_eq!(page["flashes"][0]["category"], "info");

		let again = warp::test::request()
			.path("/en_US/")
			.header("host", "shop.example.com")
			.header("cookie", cookie.as_str())
			.reply(&filter)
			.await;
		let page: serde_json::Value = serde_json::from_slice(again.body()).unwrap();
		assert_eq!(page["flashes"], serde_json::json!([]));
	}

	#[tokio::test]
	async fn anonymous_visits_leave_no_session() {
		let shop = test_shop();
		let filter = home(&shop);

		for _ in 0..3 {
			let response = warp::test::request()
				.path("/en_US/")
				.header("host", "shop.example.com")
				.reply(&filter)
				.await;
			assert_eq!(response.status(), StatusCode::OK);
			assert!(!response.headers().contains_key(header::SET_COOKIE));
		}

		assert!(shop.sessions.is_empty().await);
	}

	#[tokio::test]
	async fn logout_ends_the_session() {
		let shop = test_shop();
		let filter = login(&shop).or(logout(&shop)).or(home(&shop));

		let response = warp::test::request()
			.method("POST")
			.path("/en_US/login")
			.header("host", "shop.example.com")
			.header("content-type", "application/x-www-form-urlencoded")
			.body("user=7")
			.reply(&filter)
			.await;
		let logged_in = cookie(&response);
		assert_eq!(shop.sessions.len().await, 1);

		let response = warp::test::request()
			.path("/en_US/logout")
			.header("host", "shop.example.com")
			.header("cookie", logged_in.as_str())
			.reply(&filter)
			.await;
		assert_eq!(response.status(), StatusCode::FOUND);
		let logged_out = cookie(&response);
		assert_ne!(logged_out, logged_in);
		assert_eq!(shop.sessions.len().await, 1);

		let stale = warp::test::request()
			.path("/en_US/")
			.header("host", "shop.example.com")
			.header("cookie", logged_in.as_str())
			.reply(&filter)
			.await;
		let page: serde_json::Value = serde_json::from_slice(stale.body()).unwrap();
		assert_eq!(page["user"], serde_json::Value::Null);

		let home = warp::test::request()
			.path("/en_US/")
			.header("host", "shop.example.com")
			.header("cookie", logged_out.as_str())
			.reply(&filter)
			.await;
		let page: serde_json::Value = serde_json::from_slice(home.body()).unwrap();
		assert_eq!(page["user"], serde_json::Value::Null);
		assert_eq!(page["flashes"][0]["message"], "You have been logged out.");
	}

	#[tokio::test]
	async fn foreign_next_goes_home() {
		let shop = test_shop();
		let response = warp::test::request()
			.method("POST")
			.path("/de_DE/login")
			.header("host", "shop.example.com")
			.header("content-type", "application/x-www-form-urlencoded")
			.body("user=7&next=https%3A%2F%2Fevil.example.com%2F")
			.reply(&login(&shop))
			.await;

		assert_eq!(response.headers()[header::LOCATION], "/de_DE/");
	}

	#[tokio::test]
	async fn account_requires_login() {
		let shop = test_shop();
		let filter = account(&shop).recover(recover);

		let response = warp::test::request()
			.path("/en_US/account")
			.header("host", "shop.example.com")
			.reply(&filter)
			.await;
		assert_eq!(response.status(), StatusCode::FOUND);
		assert_eq!(response.headers()[header::LOCATION], "https://shop.example.com/en_US/account");
	}
}

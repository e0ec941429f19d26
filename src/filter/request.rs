use std::sync::Arc;

use tokio::sync::OnceCell;
use url::Url;
use warp::http::{header, StatusCode};
use warp::path::FullPath;
use warp::{reject::Reject, Filter, Rejection, Reply};

use crate::config::Config;
use crate::session::{Flash, Session, SessionStore, SESSION_COOKIE};
use crate::urls::{UrlBuilder, UrlMap};

#[derive(Debug)]
pub struct InvalidRequestUrl;

impl Reject for InvalidRequestUrl {}

impl Reply for InvalidRequestUrl {
	fn into_response(self) -> warp::reply::Response {
		StatusCode::BAD_REQUEST.into_response()
	}
}

/// Everything a handler needs to know about the request it is serving.
#[derive(Debug)]
pub struct RequestContext {
	url: Url,
	pub urls: UrlBuilder,
	pub session: Session,
	flashes: OnceCell<Vec<Flash>>,
}

impl RequestContext {
	pub fn new(url: Url, urls: UrlBuilder, session: Session) -> Self {
		Self { url, urls, session, flashes: OnceCell::new() }
	}

	/// The full url of the request, as the client sees it.
	pub fn url(&self) -> &Url {
		&self.url
	}

	pub fn is_secure(&self) -> bool {
		self.url.scheme() == "https"
	}

	pub fn language(&self) -> &str {
		self.urls.language()
	}

	/// Flashed messages with their categories.
	///
	/// The session queue is drained on the first call; later calls during
	/// the same request return the same messages.
	pub async fn flashes(&self) -> &[Flash] {
		self.flashes
			.get_or_init(|| self.session.take_flashes())
			.await
	}

	pub async fn get_flashed_messages(&self) -> Vec<&str> {
		self.flashes().await
			.iter()
			.map(|flash| flash.message.as_str())
			.collect()
	}

	/// Attach the session cookie if this request started a session and
	/// stored something in it.
	pub fn finish<R: Reply>(&self, reply: R) -> warp::reply::Response {
		if self.session.is_new() && self.session.is_saved() {
			warp::reply::with_header(reply, header::SET_COOKIE, self.session.cookie())
				.into_response()
		} else {
			reply.into_response()
		}
	}
}

fn request_url(
	host: Option<String>,
	forwarded_proto: Option<String>,
	path: &FullPath,
	query: &str,
	fallback_host: &str,
) -> Result<Url, url::ParseError> {
	let scheme = match forwarded_proto.as_deref() {
		Some("https") => "https",
		_ => "http",
	};
	let host = host.unwrap_or_else(|| fallback_host.to_owned());

	let mut url = Url::parse(&format!("{}://{}{}", scheme, host, path.as_str()))?;
	if !query.is_empty() {
		url.set_query(Some(query));
	}
	Ok(url)
}

fn language_of(path: &FullPath, config: &Config) -> String {
	path.as_str()
		.trim_start_matches('/')
		.split('/')
		.next()
		.filter(|segment| config.is_language(segment))
		.unwrap_or(&config.default_language)
		.to_owned()
}

pub fn context(
	config: &'static Config,
	map: Arc<UrlMap>,
	sessions: Arc<SessionStore>,
) -> impl Filter<Extract = (RequestContext,), Error = Rejection> + Clone {
	warp::header::optional::<String>(header::HOST.as_str())
		.and(warp::header::optional::<String>("x-forwarded-proto"))
		.and(warp::path::full())
		.and(warp::query::raw().or(warp::any().map(String::new)).unify())
		.and(warp::cookie::optional::<String>(SESSION_COOKIE))
		.and_then(move |
			host: Option<String>,
			proto: Option<String>,
			path: FullPath,
			query: String,
			cookie: Option<String>,
		| {
			let map = Arc::clone(&map);
			let sessions = Arc::clone(&sessions);
			async move {
				let url = request_url(host, proto, &path, &query, &config.host)
					.map_err(|_| warp::reject::custom(InvalidRequestUrl))?;

				let mut base = url.clone();
				base.set_path("/");
				base.set_query(None);

				let language = language_of(&path, config);
				let urls = UrlBuilder::new(map, base, language);
				let session = sessions.load(cookie.as_deref()).await;

				Ok::<_, Rejection>(RequestContext::new(url, urls, session))
			}
		})
}

#[cfg(test)]
pub(crate) fn test_config() -> &'static Config {
	Box::leak(Box::new(crate::config::test_config()))
}

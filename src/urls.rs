//! Named URL rules and reverse URL building.
//!
//! Rules are registered once at start-up with a pattern such as
//! `/<language>/product/<uri>`. A [`UrlBuilder`] is bound to a single
//! request: it knows the scheme and host the request came in on, and the
//! language it is being served in, so that `url_for` can fill those in.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use url::Url;
use warp::http::StatusCode;
use warp::{reject::Reject, Reply};

#[derive(Error, Debug)]
pub enum BuildError {
	#[error("no url rule for endpoint {0}")]
	UnknownEndpoint(String),
	#[error("endpoint {endpoint} requires a value for {name}")]
	MissingValue { endpoint: String, name: String },
	#[error("base url cannot carry a path")]
	InvalidBase,
}

impl Reject for BuildError {}

impl Reply for BuildError {
	fn into_response(self) -> warp::reply::Response {
		tracing::error!(error = %self, "url build failed");
		StatusCode::INTERNAL_SERVER_ERROR.into_response()
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
	Text(String),
	Variable(String),
}

/// One path segment, e.g. `<page>.xml` is a variable followed by text.
type Segment = Vec<Part>;

fn parse_segment(segment: &str) -> Segment {
	let mut parts = Vec::new();
	let mut rest = segment;

	while let Some(start) = rest.find('<') {
		let Some(length) = rest[start..].find('>') else {
			break;
		};

		if start > 0 {
			parts.push(Part::Text(rest[..start].to_owned()));
		}
		parts.push(Part::Variable(rest[start + 1..start + length].to_owned()));
		rest = &rest[start + length + 1..];
	}

	if !rest.is_empty() || parts.is_empty() {
		parts.push(Part::Text(rest.to_owned()));
	}

	parts
}

#[derive(Debug, Clone)]
struct Rule {
	segments: Vec<Segment>,
}

impl Rule {
	fn parse(pattern: &str) -> Self {
		let segments = pattern.trim_start_matches('/')
			.split('/')
			.map(parse_segment)
			.collect();

		Self { segments }
	}

	fn has_variable(&self, name: &str) -> bool {
		self.segments.iter()
			.flatten()
			.any(|part| matches!(part, Part::Variable(v) if v == name))
	}
}

#[derive(Debug, Default)]
pub struct UrlMap {
	rules: HashMap<String, Rule>,
}

impl UrlMap {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn rule(mut self, endpoint: &str, pattern: &str) -> Self {
		self.rules.insert(endpoint.to_owned(), Rule::parse(pattern));
		self
	}
}

#[derive(Debug, Default, Clone)]
pub struct UrlOptions {
	/// Produce an absolute url.
	pub external: bool,
	/// Produce an absolute https url. Implies `external`.
	pub secure: bool,
	/// Extra query parameters. When given, values that do not match a
	/// placeholder of the rule are dropped instead of being appended.
	pub params: Option<Vec<(String, String)>>,
}

impl UrlOptions {
	pub fn external() -> Self {
		Self { external: true, ..Self::default() }
	}

	pub fn secure() -> Self {
		Self { secure: true, ..Self::default() }
	}
}

#[derive(Debug, Clone)]
pub struct UrlBuilder {
	map: Arc<UrlMap>,
	base: Url,
	language: String,
}

impl UrlBuilder {
	pub fn new(map: Arc<UrlMap>, base: Url, language: String) -> Self {
		Self { map, base, language }
	}

	pub fn language(&self) -> &str {
		&self.language
	}

	/// Relative url for `endpoint`, see [`UrlBuilder::build`].
	pub fn url_for<I, K, V>(
		&self,
		endpoint: &str,
		values: I,
	) -> Result<String, BuildError>
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: ToString,
	{
		self.build(endpoint, values, &UrlOptions::default())
	}

	pub fn build<I, K, V>(
		&self,
		endpoint: &str,
		values: I,
		options: &UrlOptions,
	) -> Result<String, BuildError>
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: ToString,
	{
		let rule = self.map.rules.get(endpoint)
			.ok_or_else(|| BuildError::UnknownEndpoint(endpoint.to_owned()))?;

		let mut values = values.into_iter()
			.map(|(key, value)| (key.into(), value.to_string()))
			.collect::<Vec<(String, String)>>();

		if !values.iter().any(|(key, _)| key == "language") {
			values.push((String::from("language"), self.language.clone()));
		}

		let mut url = self.base.clone();
		url.set_query(None);
		url.set_fragment(None);

		{
			let mut path = url.path_segments_mut()
				.map_err(|_| BuildError::InvalidBase)?;
			path.clear();

			for segment in &rule.segments {
				let mut text = String::new();
				for part in segment {
					match part {
						Part::Text(literal) => text.push_str(literal),
						Part::Variable(name) => {
							let (_, value) = values.iter()
								.find(|(key, _)| key == name)
								.ok_or_else(|| BuildError::MissingValue {
									endpoint: endpoint.to_owned(),
									name: name.clone(),
								})?;
							text.push_str(value);
						},
					}
				}
				path.push(&text);
			}
		}

		let query = match options.params {
			Some(ref params) => params.clone(),
			None => values.into_iter()
				.filter(|(key, _)| !rule.has_variable(key))
				.collect(),
		};

		if !query.is_empty() {
			url.query_pairs_mut().extend_pairs(query);
		}

		if options.secure {
			// http -> https is always a permitted scheme change
			let _ = url.set_scheme("https");
		}

		if options.external || options.secure {
			Ok(url.to_string())
		} else {
			match url.query() {
				Some(query) => Ok(format!("{}?{}", url.path(), query)),
				None => Ok(url.path().to_owned()),
			}
		}
	}
}

/// Website name from an HTTP `Host` value.
pub fn website_from_host(http_host: &str) -> &str {
	http_host.split(':').next().unwrap_or(http_host)
}

#[cfg(test)]
pub(crate) fn test_builder() -> UrlBuilder {
	let map = UrlMap::new()
		.rule("website.home", "/<language>/")
		.rule("website.login", "/<language>/login")
		.rule("product.product.render", "/<language>/product/<uri>")
		.rule("product.category.render", "/<language>/category/<uri>")
		.rule("product.product.sitemap", "/sitemaps/product/<page>.xml");

	UrlBuilder::new(
		Arc::new(map),
		Url::parse("http://shop.example.com/").unwrap(),
		String::from("en_US"),
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	const NO_VALUES: [(&str, &str); 0] = [];

	#[test]
	fn language_fills_placeholder() {
		let urls = test_builder();
		assert_eq!(urls.url_for("website.home", NO_VALUES).unwrap(), "/en_US/");
		assert_eq!(
			urls.url_for("website.home", [("language", "de_DE")]).unwrap(),
			"/de_DE/",
		);
	}

	#[test]
	fn unknown_values_become_query() {
		let urls = test_builder();
		let url = urls.url_for(
			"product.product.render",
			[("uri", "red-shoe"), ("page", "2")],
		).unwrap();
		assert_eq!(url, "/en_US/product/red-shoe?page=2");
	}

	#[test]
	fn language_is_appended_when_rule_lacks_it() {
		let urls = test_builder();
		let url = urls.url_for("product.product.sitemap", [("page", 3)]).unwrap();
		assert_eq!(url, "/sitemaps/product/3.xml?language=en_US");
	}

	#[test]
	fn params_replace_unknown_values() {
		let urls = test_builder();
		let options = UrlOptions {
			params: Some(vec![(String::from("q"), String::from("blue shoe"))]),
			..UrlOptions::default()
		};
		let url = urls.build(
			"product.product.render",
			[("uri", "red-shoe"), ("page", "2")],
			&options,
		).unwrap();
		assert_eq!(url, "/en_US/product/red-shoe?q=blue+shoe");
	}

	#[test]
	fn external_and_secure() {
		let urls = test_builder();
		assert_eq!(
			urls.build("website.login", NO_VALUES, &UrlOptions::external()).unwrap(),
			"http://shop.example.com/en_US/login",
		);
		assert_eq!(
			urls.build("website.login", NO_VALUES, &UrlOptions::secure()).unwrap(),
			"https://shop.example.com/en_US/login",
		);
	}

	#[test]
	fn placeholder_values_are_encoded() {
		let urls = test_builder();
		let url = urls.url_for("product.product.render", [("uri", "a/b c")]).unwrap();
		assert_eq!(url, "/en_US/product/a%2Fb%20c");
	}

	#[test]
	fn build_errors() {
		let urls = test_builder();
		assert!(matches!(
			urls.url_for("nope", NO_VALUES),
			Err(BuildError::UnknownEndpoint(_)),
		));
		assert!(matches!(
			urls.url_for("product.product.render", NO_VALUES),
			Err(BuildError::MissingValue { .. }),
		));
	}

	#[test]
	fn mixed_segments() {
		assert_eq!(
			parse_segment("<page>.xml"),
			vec![Part::Variable(String::from("page")), Part::Text(String::from(".xml"))],
		);
		assert_eq!(parse_segment(""), vec![Part::Text(String::new())]);
	}

	#[test]
	fn host_without_port() {
		assert_eq!(website_from_host("shop.example.com:8000"), "shop.example.com");
		assert_eq!(website_from_host("shop.example.com"), "shop.example.com");
	}
}

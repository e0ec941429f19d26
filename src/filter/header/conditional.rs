use std::time::SystemTime;

use chrono::{DateTime, Utc};
use warp::http::header;
use warp::{Filter, Rejection};

/// Validators a client sent along to make its request conditional.
#[derive(Debug, Default, Clone)]
pub struct Conditions {
	pub if_none_match: Option<String>,
	pub if_modified_since: Option<String>,
}

impl Conditions {
	/// Whether the client's cached copy is still current.
	///
	/// `If-None-Match` wins over `If-Modified-Since` when both are present.
	pub fn not_modified(
		&self,
		etag: Option<&str>,
		modified: Option<SystemTime>,
	) -> bool {
		if let Some(ref candidates) = self.if_none_match {
			let Some(etag) = etag else {
				return false;
			};

			return candidates.split(',')
				.map(|candidate| candidate.trim())
				.any(|candidate| {
					candidate == "*"
						|| unquote(candidate.trim_start_matches("W/")) == unquote(etag)
				});
		}

		match (&self.if_modified_since, modified) {
			(Some(since), Some(modified)) => {
				match DateTime::parse_from_rfc2822(since) {
					Ok(since) => DateTime::<Utc>::from(modified).timestamp() <= since.timestamp(),
					Err(_) => false,
				}
			},
			_ => false,
		}
	}
}

fn unquote(value: &str) -> &str {
	value.trim_matches('"')
}

/// Formats a time the way HTTP date headers expect it.
pub fn http_date(time: SystemTime) -> String {
	DateTime::<Utc>::from(time)
		.format("%a, %d %b %Y %H:%M:%S GMT")
		.to_string()
}

pub fn conditions() -> impl Filter<Extract = (Conditions,), Error = Rejection> + Copy {
	warp::header::optional::<String>(header::IF_NONE_MATCH.as_str())
		.and(warp::header::optional::<String>(header::IF_MODIFIED_SINCE.as_str()))
		.map(|if_none_match, if_modified_since| Conditions {
			if_none_match,
			if_modified_since,
		})
}

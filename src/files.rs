//! Sending files as responses.
//!
//! Never hand user supplied names to [`send_file`] directly; go through
//! [`send_from_directory`], which refuses to leave the directory.

use std::io::{self, Seek};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use deunicode::deunicode;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;
use tokio_util::io::ReaderStream;
use warp::http::header::{self, HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue};
use warp::http::StatusCode;
use warp::hyper::{Body, Response};
use warp::{reject::Reject, Reply};

use crate::config::Config;
use crate::filter::header::conditional::{http_date, Conditions};

pub const DEFAULT_CACHE_TIMEOUT: u64 = 60 * 60 * 12;

const X_SENDFILE: &str = "x-sendfile";

#[derive(Error, Debug)]
pub enum FileError {
	#[error("file not found")]
	NotFound,
	#[error("filename unavailable, required for sending as attachment")]
	MissingFilename,
	#[error(transparent)]
	Header(#[from] InvalidHeaderValue),
	#[error(transparent)]
	Io(io::Error),
}

impl From<io::Error> for FileError {
	fn from(error: io::Error) -> Self {
		match error.kind() {
			io::ErrorKind::NotFound => Self::NotFound,
			_ => Self::Io(error),
		}
	}
}

impl Reject for FileError {}

impl From<&FileError> for StatusCode {
	fn from(error: &FileError) -> Self {
		match error {
			FileError::NotFound => StatusCode::NOT_FOUND,
			_ => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl Reply for FileError {
	fn into_response(self) -> warp::reply::Response {
		let status = StatusCode::from(&self);
		if status.is_server_error() {
			tracing::error!(error = %self, "failed to send file");
		}
		status.into_response()
	}
}

/// What to send.
#[derive(Debug)]
pub enum FileSource {
	/// A file on disk. Relative paths resolve against [`FileSettings::root`].
	Path(PathBuf),
	/// An already open file, positioned at the start of the data to send.
	///
	/// `name` is only used to guess the mimetype and name attachments; an
	/// open handle never gets an etag or `X-Sendfile`.
	Handle {
		file: std::fs::File,
		name: Option<String>,
	},
}

#[derive(Debug, Clone)]
pub struct SendFileOptions {
	/// Detected from the file name when missing.
	pub mimetype: Option<String>,
	pub as_attachment: bool,
	pub attachment_filename: Option<String>,
	pub add_etags: bool,
	/// Seconds; zero disables `max-age` and `Expires`.
	pub cache_timeout: u64,
	pub conditional: bool,
}

impl Default for SendFileOptions {
	fn default() -> Self {
		Self {
			mimetype: None,
			as_attachment: false,
			attachment_filename: None,
			add_etags: true,
			cache_timeout: DEFAULT_CACHE_TIMEOUT,
			conditional: false,
		}
	}
}

#[derive(Debug, Clone)]
pub struct FileSettings {
	pub root: PathBuf,
	pub use_x_sendfile: bool,
}

impl From<&Config> for FileSettings {
	fn from(config: &Config) -> Self {
		Self {
			root: config.file_root(),
			use_x_sendfile: config.use_x_sendfile,
		}
	}
}

/// Adler-32 checksum, used to keep etags short for long paths.
fn adler32(data: &[u8]) -> u32 {
	const MOD_ADLER: u32 = 65521;

	let (a, b) = data.iter()
		.fold((1u32, 0u32), |(a, b), &byte| {
			let a = (a + u32::from(byte)) % MOD_ADLER;
			(a, (b + a) % MOD_ADLER)
		});

	(b << 16) | a
}

fn unix_seconds(time: SystemTime) -> u64 {
	time.duration_since(SystemTime::UNIX_EPOCH)
		.unwrap_or_default()
		.as_secs()
}

fn etag_for(path: &Path, modified: SystemTime, size: u64) -> String {
	format!(
		"\"nereid-{}-{}-{}\"",
		unix_seconds(modified),
		size,
		adler32(path.as_os_str().to_string_lossy().as_bytes()),
	)
}

/// RFC 5987 `attr-char`, everything else is percent-encoded.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
	.remove(b'!').remove(b'#').remove(b'$').remove(b'&').remove(b'+').remove(b'-')
	.remove(b'.').remove(b'^').remove(b'_').remove(b'`').remove(b'|').remove(b'~');

/// Printable ASCII stand-in for a filename, for clients without
/// `filename*` support.
fn ascii_filename(filename: &str) -> String {
	deunicode(filename)
		.chars()
		.filter(|c| c.is_ascii_graphic() || *c == ' ')
		.map(|c| if c == '"' || c == '\\' { '_' } else { c })
		.collect()
}

fn content_disposition(filename: &str) -> String {
	let fallback = ascii_filename(filename);
	if fallback == filename {
		return format!("attachment; filename=\"{}\"", fallback);
	}

	format!(
		"attachment; filename=\"{}\"; filename*=UTF-8''{}",
		fallback,
		utf8_percent_encode(filename, ATTR_CHAR),
	)
}

fn insert(
	headers: &mut HeaderMap,
	name: HeaderName,
	value: &str,
) -> Result<(), FileError> {
	headers.insert(name, HeaderValue::from_str(value)?);
	Ok(())
}

/// Build a response for a file.
///
/// With `X-Sendfile` enabled and a path to send, the body is left empty
/// for the front server to fill in.
pub async fn send_file(
	source: FileSource,
	options: &SendFileOptions,
	settings: &FileSettings,
	conditions: &Conditions,
) -> Result<warp::reply::Response, FileError> {
	let (path, handle, display_name) = match source {
		FileSource::Path(path) => {
			let path = if path.is_absolute() {
				path
			} else {
				settings.root.join(path)
			};
			(Some(path), None, None)
		},
		FileSource::Handle { file, name } => (None, Some(file), name),
	};
	let metadata = match (&path, &handle) {
		(Some(path), _) => tokio::fs::metadata(path).await?,
		(None, Some(file)) => file.metadata()?,
		(None, None) => return Err(FileError::NotFound),
	};

	let guess_from = path.as_ref()
		.and_then(|path| path.file_name())
		.map(|name| name.to_string_lossy().into_owned())
		.or(display_name)
		.or_else(|| options.attachment_filename.clone());

	let mimetype = match (&options.mimetype, &guess_from) {
		(Some(mimetype), _) => mimetype.clone(),
		(None, Some(name)) => mime_guess::from_path(name)
			.first_or_octet_stream()
			.to_string(),
		(None, None) => String::from("application/octet-stream"),
	};

	let mut headers = HeaderMap::new();
	insert(&mut headers, header::CONTENT_TYPE, &mimetype)?;

	if options.as_attachment {
		let filename = options.attachment_filename.clone()
			.or(guess_from)
			.ok_or(FileError::MissingFilename)?;
		insert(&mut headers, header::CONTENT_DISPOSITION, &content_disposition(&filename))?;
	}

	let modified = path.as_ref().and(metadata.modified().ok());

	let mut cache_control = String::from("public");
	if options.cache_timeout > 0 {
		cache_control.push_str(&format!(", max-age={}", options.cache_timeout));
		let expires = SystemTime::now() + Duration::from_secs(options.cache_timeout);
		insert(&mut headers, header::EXPIRES, &http_date(expires))?;
	}
	insert(&mut headers, header::CACHE_CONTROL, &cache_control)?;

	if let Some(modified) = modified {
		insert(&mut headers, header::LAST_MODIFIED, &http_date(modified))?;
	}

	let etag = match (&path, modified) {
		(Some(path), Some(modified)) if options.add_etags => {
			Some(etag_for(path, modified, metadata.len()))
		},
		_ => None,
	};
	if let Some(ref etag) = etag {
		insert(&mut headers, header::ETAG, etag)?;
	}

	let not_modified = options.conditional
		&& etag.is_some()
		&& conditions.not_modified(etag.as_deref(), modified);
	if not_modified {
		// no x-sendfile here, some servers ignore the status and send the body
		headers.remove(header::CONTENT_TYPE);
		headers.remove(header::CONTENT_DISPOSITION);
		let mut response = Response::new(Body::empty());
		*response.status_mut() = StatusCode::NOT_MODIFIED;
		*response.headers_mut() = headers;
		return Ok(response);
	}

	let body = match (path, handle) {
		(Some(path), _) if settings.use_x_sendfile => {
			insert(
				&mut headers,
				HeaderName::from_static(X_SENDFILE),
				&path.to_string_lossy(),
			)?;
			Body::empty()
		},
		(Some(path), _) => {
			let file = tokio::fs::File::open(&path).await?;
			insert(&mut headers, header::CONTENT_LENGTH, &metadata.len().to_string())?;
			Body::wrap_stream(ReaderStream::new(file))
		},
		(None, Some(mut file)) => {
			let remaining = metadata.len().saturating_sub(file.stream_position()?);
			let file = tokio::fs::File::from_std(file);
			insert(&mut headers, header::CONTENT_LENGTH, &remaining.to_string())?;
			Body::wrap_stream(ReaderStream::new(file))
		},
		(None, None) => Body::empty(),
	};

	let mut response = Response::new(body);
	*response.headers_mut() = headers;
	Ok(response)
}

/// POSIX style lexical normalisation: drops `.` and empty components and
/// folds `..` into its parent where there is one.
fn normpath(path: &str) -> String {
	let absolute = path.starts_with('/');
	let mut parts: Vec<&str> = Vec::new();

	for part in path.split('/') {
		match part {
			"" | "." => {},
			".." => match parts.last() {
				Some(&last) if last != ".." => {
					parts.pop();
				},
				_ if absolute => {},
				_ => parts.push(".."),
			},
			part => parts.push(part),
		}
	}

	let joined = parts.join("/");
	if absolute {
		format!("/{}", joined)
	} else if joined.is_empty() {
		String::from(".")
	} else {
		joined
	}
}

/// Send `filename` from inside `directory`, as a conditional response.
///
/// Names that normalise to somewhere outside the directory, and names that
/// are not regular files, are reported as not found.
pub async fn send_from_directory(
	directory: &Path,
	filename: &str,
	options: SendFileOptions,
	settings: &FileSettings,
	conditions: &Conditions,
) -> Result<warp::reply::Response, FileError> {
	let filename = normpath(filename);
	if filename == ".." || filename.starts_with('/') || filename.starts_with("../") {
		return Err(FileError::NotFound);
	}

	let path = directory.join(filename);
	let is_file = tokio::fs::metadata(&path).await
		.map(|metadata| metadata.is_file())
		.unwrap_or(false);
	if !is_file {
		return Err(FileError::NotFound);
	}

	let options = SendFileOptions { conditional: true, ..options };
	send_file(FileSource::Path(path), &options, settings, conditions).await
}

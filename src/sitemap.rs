//! sitemaps.org 0.9 documents for large record sets.
//!
//! A model's records are split into batches by id: page `n` of a section
//! covers the ids in `((n - 1) * batch_size, n * batch_size]`, and the
//! index lists one section per batch up to the highest id in the table.
//! Documents are written to an anonymous temporary file which is then
//! streamed as the response, so memory use does not grow with the batch.

use std::fmt::Display;
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};

use chrono::{NaiveDateTime, SecondsFormat, TimeZone, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use sea_orm::{ConnectionTrait, DbErr, Statement};
use thiserror::Error;
use warp::http::StatusCode;
use warp::{reject::Reject, Reply};

use crate::database::{Domain, Model, Operator, SearchOptions, Timestamped};
use crate::files::{send_file, FileError, FileSettings, FileSource, SendFileOptions};
use crate::filter::header::conditional::Conditions;
use crate::pagination::first_column;
use crate::urls::{BuildError, UrlBuilder, UrlOptions};

pub const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";
pub const BATCH_SIZE: u64 = 1000;
pub const CACHE_TIMEOUT: u64 = 60 * 60 * 24;
const MIMETYPE: &str = "application/xml";

#[derive(Error, Debug)]
pub enum SitemapError {
	#[error("sitemap pages start at 1")]
	InvalidPage,
	#[error(transparent)]
	Database(#[from] DbErr),
	#[error(transparent)]
	Url(#[from] BuildError),
	#[error("failed to write sitemap: {0}")]
	Write(String),
	#[error(transparent)]
	File(#[from] FileError),
}

fn write_error<E: Display>(error: E) -> SitemapError {
	SitemapError::Write(error.to_string())
}

impl Reject for SitemapError {}

impl Reply for SitemapError {
	fn into_response(self) -> warp::reply::Response {
		match self {
			SitemapError::InvalidPage => StatusCode::NOT_FOUND.into_response(),
			SitemapError::File(error) => error.into_response(),
			error => {
				tracing::error!(%error, "sitemap failed");
				StatusCode::INTERNAL_SERVER_ERROR.into_response()
			},
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Changefreq {
	Always,
	Hourly,
	Daily,
	Weekly,
	Monthly,
	Yearly,
	Never,
}

impl Changefreq {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Always => "always",
			Self::Hourly => "hourly",
			Self::Daily => "daily",
			Self::Weekly => "weekly",
			Self::Monthly => "monthly",
			Self::Yearly => "yearly",
			Self::Never => "never",
		}
	}
}

/// A model whose records each have a public page.
pub trait SitemapModel: Model {
	fn absolute_url(
		&self,
		urls: &UrlBuilder,
		record: &Self::Record,
	) -> Result<String, BuildError>;

	/// Endpoint serving one section, given a `page` value.
	fn sitemap_endpoint(&self) -> String {
		format!("{}.sitemap", self.name())
	}
}

/// W3C datetime of a naive UTC timestamp, e.g. `2024-03-01T12:00:00+00:00`.
pub fn w3c_datetime(timestamp: NaiveDateTime) -> String {
	Utc.from_utc_datetime(&timestamp)
		.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

pub fn page_count(count: u64, batch_size: u64) -> u64 {
	count.div_ceil(batch_size.max(1))
}

#[derive(Debug, Clone, PartialEq)]
pub struct UrlEntry {
	pub loc: String,
	pub lastmod: String,
	pub changefreq: Changefreq,
	pub priority: f32,
}

fn text_element<W: Write>(
	writer: &mut Writer<W>,
	name: &str,
	text: &str,
) -> Result<(), SitemapError> {
	writer.write_event(Event::Start(BytesStart::new(name))).map_err(write_error)?;
	writer.write_event(Event::Text(BytesText::new(text))).map_err(write_error)?;
	writer.write_event(Event::End(BytesEnd::new(name))).map_err(write_error)?;
	Ok(())
}

fn write_document<W, F>(out: W, root: &str, body: F) -> Result<W, SitemapError>
where
	W: Write,
	F: FnOnce(&mut Writer<W>) -> Result<(), SitemapError>,
{
	let mut writer = Writer::new_with_indent(out, b' ', 2);
	writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
		.map_err(write_error)?;

	let start = BytesStart::new(root).with_attributes([("xmlns", SITEMAP_NS)]);
	writer.write_event(Event::Start(start)).map_err(write_error)?;
	body(&mut writer)?;
	writer.write_event(Event::End(BytesEnd::new(root))).map_err(write_error)?;

	Ok(writer.into_inner())
}

pub fn write_index<W: Write>(out: W, locs: &[String]) -> Result<W, SitemapError> {
	write_document(out, "sitemapindex", |writer| {
		for loc in locs {
			writer.write_event(Event::Start(BytesStart::new("sitemap"))).map_err(write_error)?;
			text_element(writer, "loc", loc)?;
			writer.write_event(Event::End(BytesEnd::new("sitemap"))).map_err(write_error)?;
		}
		Ok(())
	})
}

pub fn write_urlset<W: Write>(out: W, entries: &[UrlEntry]) -> Result<W, SitemapError> {
	write_document(out, "urlset", |writer| {
		for entry in entries {
			writer.write_event(Event::Start(BytesStart::new("url"))).map_err(write_error)?;
			text_element(writer, "loc", &entry.loc)?;
			text_element(writer, "lastmod", &entry.lastmod)?;
			text_element(writer, "changefreq", entry.changefreq.as_str())?;
			text_element(writer, "priority", &format!("{:.1}", entry.priority))?;
			writer.write_event(Event::End(BytesEnd::new("url"))).map_err(write_error)?;
		}
		Ok(())
	})
}

/// Write a document to an anonymous temporary file and stream it back.
async fn respond<F>(
	name: &str,
	cache_timeout: u64,
	settings: &FileSettings,
	conditions: &Conditions,
	write: F,
) -> Result<warp::reply::Response, SitemapError>
where
	F: FnOnce(BufWriter<File>) -> Result<BufWriter<File>, SitemapError>,
{
	let buffer = BufWriter::new(tempfile::tempfile().map_err(write_error)?);
	let mut file = write(buffer)?.into_inner().map_err(write_error)?;
	file.seek(SeekFrom::Start(0)).map_err(write_error)?;

	let options = SendFileOptions {
		mimetype: Some(String::from(MIMETYPE)),
		cache_timeout,
		..SendFileOptions::default()
	};
	let source = FileSource::Handle { file, name: Some(name.to_owned()) };

	Ok(send_file(source, &options, settings, conditions).await?)
}

/// Per-entry values shared by every url of a section.
#[derive(Debug, Clone, Copy)]
struct SectionFormat {
	batch_size: u64,
	changefreq: Changefreq,
	priority: f32,
	cache_timeout: u64,
}

impl Default for SectionFormat {
	fn default() -> Self {
		Self {
			batch_size: BATCH_SIZE,
			changefreq: Changefreq::Never,
			priority: 0.5,
			cache_timeout: CACHE_TIMEOUT,
		}
	}
}

impl SectionFormat {
	/// Id or row bounds `(start, end]` of `page`, within the range the
	/// database accepts.
	fn bounds(&self, page: u64) -> Result<(i64, i64), SitemapError> {
		let end = page.checked_mul(self.batch_size)
			.and_then(|end| i64::try_from(end).ok())
			.ok_or(SitemapError::InvalidPage)?;
		let start = page.checked_sub(1)
			.and_then(|previous| previous.checked_mul(self.batch_size))
			.and_then(|start| i64::try_from(start).ok())
			.ok_or(SitemapError::InvalidPage)?;
		Ok((start, end))
	}

	fn entries<M>(
		&self,
		model: &M,
		urls: &UrlBuilder,
		records: &[M::Record],
	) -> Result<Vec<UrlEntry>, BuildError>
	where
		M: SitemapModel,
		M::Record: Timestamped,
	{
		records.iter()
			.map(|record| -> Result<UrlEntry, BuildError> {
				Ok(UrlEntry {
					loc: model.absolute_url(urls, record)?,
					lastmod: w3c_datetime(record.last_modified()),
					changefreq: self.changefreq,
					priority: self.priority,
				})
			})
			.collect()
	}
}

/// The index of every section of a model's sitemap.
pub struct SitemapIndex<'a, M> {
	model: &'a M,
	urls: &'a UrlBuilder,
	batch_size: u64,
	cache_timeout: u64,
}

impl<'a, M: SitemapModel> SitemapIndex<'a, M> {
	pub fn new(model: &'a M, urls: &'a UrlBuilder) -> Self {
		Self {
			model,
			urls,
			batch_size: BATCH_SIZE,
			cache_timeout: CACHE_TIMEOUT,
		}
	}

	pub fn batch_size(mut self, batch_size: u64) -> Self {
		self.batch_size = batch_size.max(1);
		self
	}

	pub fn cache_timeout(mut self, cache_timeout: u64) -> Self {
		self.cache_timeout = cache_timeout;
		self
	}

	/// The highest id in the table; ids are allocated in increasing order
	/// so this bounds every batch.
	pub async fn count(&self) -> Result<u64, SitemapError> {
		let max_id = self.model.max_id().await?;
		Ok(max_id.map_or(0, |id| id.max(0) as u64))
	}

	pub async fn page_count(&self) -> Result<u64, SitemapError> {
		Ok(page_count(self.count().await?, self.batch_size))
	}

	pub async fn locs(&self) -> Result<Vec<String>, SitemapError> {
		let endpoint = self.model.sitemap_endpoint();
		let pages = self.page_count().await?;

		(1..=pages)
			.map(|page| {
				self.urls
					.build(&endpoint, [("page", page)], &UrlOptions::external())
					.map_err(SitemapError::from)
			})
			.collect()
	}

	pub async fn render(
		&self,
		settings: &FileSettings,
		conditions: &Conditions,
	) -> Result<warp::reply::Response, SitemapError> {
		let locs = self.locs().await?;
		tracing::debug!(model = self.model.name(), sections = locs.len(), "rendering sitemap index");

		respond("index.xml", self.cache_timeout, settings, conditions, |out| {
			write_index(out, &locs)
		}).await
	}
}

/// One batch of a model's records, selected by id window and domain.
pub struct SitemapSection<'a, M> {
	model: &'a M,
	urls: &'a UrlBuilder,
	domain: Domain,
	page: u64,
	format: SectionFormat,
}

impl<'a, M> SitemapSection<'a, M>
where
	M: SitemapModel,
	M::Record: Timestamped,
{
	pub fn new(
		model: &'a M,
		urls: &'a UrlBuilder,
		domain: Domain,
		page: u64,
	) -> Result<Self, SitemapError> {
		if page == 0 {
			return Err(SitemapError::InvalidPage);
		}

		Ok(Self {
			model,
			urls,
			domain,
			page,
			format: SectionFormat::default(),
		})
	}

	pub fn batch_size(mut self, batch_size: u64) -> Self {
		self.format.batch_size = batch_size.max(1);
		self
	}

	pub fn changefreq(mut self, changefreq: Changefreq) -> Self {
		self.format.changefreq = changefreq;
		self
	}

	pub fn priority(mut self, priority: f32) -> Self {
		self.format.priority = priority;
		self
	}

	pub fn cache_timeout(mut self, cache_timeout: u64) -> Self {
		self.format.cache_timeout = cache_timeout;
		self
	}

	/// Exclusive lower bound of the id window.
	pub fn min_id(&self) -> Result<i64, SitemapError> {
		Ok(self.format.bounds(self.page)?.0)
	}

	/// Inclusive upper bound of the id window.
	pub fn max_id(&self) -> Result<i64, SitemapError> {
		Ok(self.format.bounds(self.page)?.1)
	}

	fn window_domain(&self) -> Result<Domain, SitemapError> {
		let (min_id, max_id) = self.format.bounds(self.page)?;
		Ok(Domain::new()
			.and("id", Operator::Gt, min_id)
			.and("id", Operator::Le, max_id)
			.extend(&self.domain))
	}

	pub async fn entries(&self) -> Result<Vec<UrlEntry>, SitemapError> {
		let ids = self.model
			.search(&self.window_domain()?, &SearchOptions::default()).await?;
		let records = self.model.browse(&ids).await?;
		Ok(self.format.entries(self.model, self.urls, &records)?)
	}

	pub async fn render(
		&self,
		settings: &FileSettings,
		conditions: &Conditions,
	) -> Result<warp::reply::Response, SitemapError> {
		let entries = self.entries().await?;
		tracing::debug!(
			model = self.model.name(),
			page = self.page,
			urls = entries.len(),
			"rendering sitemap section",
		);

		let name = format!("{}.xml", self.page);
		respond(&name, self.format.cache_timeout, settings, conditions, |out| {
			write_urlset(out, &entries)
		}).await
	}
}

/// A sitemap section whose ids come from hand-written SQL.
///
/// The query selects ids in its first column; `LIMIT` and `OFFSET` for the
/// page are appended to it.
pub struct SitemapSectionSql<'a, M, C> {
	model: &'a M,
	urls: &'a UrlBuilder,
	connection: &'a C,
	query: String,
	page: u64,
	format: SectionFormat,
}

impl<'a, M, C> SitemapSectionSql<'a, M, C>
where
	M: SitemapModel,
	M::Record: Timestamped,
	C: ConnectionTrait,
{
	pub fn new(
		model: &'a M,
		urls: &'a UrlBuilder,
		connection: &'a C,
		query: &str,
		page: u64,
	) -> Result<Self, SitemapError> {
		if page == 0 {
			return Err(SitemapError::InvalidPage);
		}

		Ok(Self {
			model,
			urls,
			connection,
			query: query.trim_end().trim_end_matches(';').to_owned(),
			page,
			format: SectionFormat::default(),
		})
	}

	pub fn batch_size(mut self, batch_size: u64) -> Self {
		self.format.batch_size = batch_size.max(1);
		self
	}

	pub fn limit(&self) -> u64 {
		self.format.batch_size
	}

	pub fn offset(&self) -> Result<i64, SitemapError> {
		Ok(self.format.bounds(self.page)?.0)
	}

	pub async fn entries(&self) -> Result<Vec<UrlEntry>, SitemapError> {
		let sql = format!("{} LIMIT {} OFFSET {}", self.query, self.limit(), self.offset()?);
		let statement = Statement::from_string(self.connection.get_database_backend(), sql);

		let ids = self.connection.query_all(statement).await?
			.iter()
			.map(first_column)
			.collect::<Result<Vec<_>, _>>()?;
		let records = self.model.browse(&ids).await?;

		Ok(self.format.entries(self.model, self.urls, &records)?)
	}

	pub async fn render(
		&self,
		settings: &FileSettings,
		conditions: &Conditions,
	) -> Result<warp::reply::Response, SitemapError> {
		let entries = self.entries().await?;
		let name = format!("{}.xml", self.page);
		respond(&name, self.format.cache_timeout, settings, conditions, |out| {
			write_urlset(out, &entries)
		}).await
	}
}

//! An in-memory product table for exercising code written against [`Model`].

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDateTime;
use sea_orm::DbErr;

use super::domain::{Clause, Direction, Domain, DomainValue, Operator};
use super::entities::product;
use super::model::{Model, Record, SearchOptions};

pub fn product(id: i32, name: &str) -> product::Model {
	product::Model {
		id,
		name: name.to_owned(),
		uri: name.to_lowercase().replace(' ', "-"),
		displayed_on_eshop: true,
		category: None,
		create_date: NaiveDateTime::default(),
		write_date: None,
	}
}

#[derive(Default)]
pub struct MemoryModel {
	records: Vec<product::Model>,
	pub searches: AtomicUsize,
	pub counts: AtomicUsize,
}

impl MemoryModel {
	pub fn new(records: Vec<product::Model>) -> Self {
		Self { records, ..Self::default() }
	}

	/// Products with ids `1..=count`, named `Product <id>`.
	pub fn numbered(count: i32) -> Self {
		Self::new((1..=count).map(|id| product(id, &format!("Product {}", id))).collect())
	}

	pub fn searches(&self) -> usize {
		self.searches.load(Ordering::SeqCst)
	}

	pub fn counts(&self) -> usize {
		self.counts.load(Ordering::SeqCst)
	}

	fn matching(&self, domain: &Domain) -> Vec<&product::Model> {
		self.records.iter()
			.filter(|record| domain.clauses().iter().all(|clause| holds(record, clause)))
			.collect()
	}
}

fn holds(record: &product::Model, clause: &Clause) -> bool {
	let field = match clause.field.as_str() {
		"id" => Some(i64::from(record.id)),
		"category" => record.category.map(i64::from),
		"displayed_on_eshop" => {
			return match clause.value {
				DomainValue::Bool(value) => match clause.operator {
					Operator::Eq => record.displayed_on_eshop == value,
					Operator::Ne => record.displayed_on_eshop != value,
					_ => false,
				},
				_ => false,
			};
		},
		_ => return false,
	};

	match (field, clause.operator, &clause.value) {
		(None, Operator::Eq, DomainValue::Null) => true,
		(Some(_), Operator::Ne, DomainValue::Null) => true,
		(Some(field), Operator::Eq, DomainValue::Int(value)) => field == *value,
		(Some(field), Operator::Ne, DomainValue::Int(value)) => field != *value,
		(Some(field), Operator::Lt, DomainValue::Int(value)) => field < *value,
		(Some(field), Operator::Le, DomainValue::Int(value)) => field <= *value,
		(Some(field), Operator::Gt, DomainValue::Int(value)) => field > *value,
		(Some(field), Operator::Ge, DomainValue::Int(value)) => field >= *value,
		(Some(field), Operator::In, DomainValue::Ints(values)) => values.contains(&field),
		(Some(field), Operator::NotIn, DomainValue::Ints(values)) => !values.contains(&field),
		_ => false,
	}
}

#[async_trait::async_trait]
impl Model for MemoryModel {
	type Record = product::Model;

	fn name(&self) -> &str {
		"product.product"
	}

	async fn search(
		&self,
		domain: &Domain,
		options: &SearchOptions,
	) -> Result<Vec<i64>, DbErr> {
		self.searches.fetch_add(1, Ordering::SeqCst);

		let mut records = self.matching(domain);
		let descending = options.order.as_ref()
			.and_then(|order| order.fields().next())
			.is_some_and(|(_, direction)| direction == Direction::Descending);
		if descending {
			records.reverse();
		}

		let limit = options.limit.unwrap_or(u64::MAX) as usize;
		Ok(records.into_iter()
			.skip(options.offset as usize)
			.take(limit)
			.map(Record::id)
			.collect())
	}

	async fn search_count(&self, domain: &Domain) -> Result<u64, DbErr> {
		self.counts.fetch_add(1, Ordering::SeqCst);
		Ok(self.matching(domain).len() as u64)
	}

	async fn browse(&self, ids: &[i64]) -> Result<Vec<Self::Record>, DbErr> {
		Ok(ids.iter()
			.filter_map(|id| self.records.iter().find(|record| record.id() == *id))
			.cloned()
			.collect())
	}

	async fn max_id(&self) -> Result<Option<i64>, DbErr> {
		Ok(self.records.iter().map(Record::id).max())
	}
}

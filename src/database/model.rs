use std::marker::PhantomData;
use std::sync::Arc;

use chrono::NaiveDateTime;
use sea_orm::{
	sea_query::{Alias, Expr, Func, SimpleExpr},
	DatabaseConnection,
	DbErr,
	EntityTrait,
	PaginatorTrait,
	QueryFilter,
	QuerySelect,
	QueryTrait,
};

use super::domain::{Domain, Order, ID_FIELD};

/// A stored row with an integer primary key.
pub trait Record {
	fn id(&self) -> i64;
}

pub trait Timestamped {
	fn create_date(&self) -> NaiveDateTime;
	fn write_date(&self) -> Option<NaiveDateTime>;

	/// When the record last changed.
	fn last_modified(&self) -> NaiveDateTime {
		self.write_date().unwrap_or_else(|| self.create_date())
	}
}

#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
	pub offset: u64,
	pub limit: Option<u64>,
	pub order: Option<Order>,
}

impl SearchOptions {
	pub fn window(offset: u64, limit: u64) -> Self {
		Self { offset, limit: Some(limit), order: None }
	}

	pub fn ordered(mut self, order: Order) -> Self {
		self.order = Some(order);
		self
	}
}

/// The record store operations pagination and sitemaps are built on.
#[async_trait::async_trait]
pub trait Model: Send + Sync {
	type Record: Record + Send + Sync;

	fn name(&self) -> &str;

	/// Ids of matching records in the requested order.
	async fn search(
		&self,
		domain: &Domain,
		options: &SearchOptions,
	) -> Result<Vec<i64>, DbErr>;

	async fn search_count(&self, domain: &Domain) -> Result<u64, DbErr>;

	/// Records for `ids`, in the order of `ids`. Unknown ids are skipped.
	async fn browse(&self, ids: &[i64]) -> Result<Vec<Self::Record>, DbErr>;

	async fn max_id(&self) -> Result<Option<i64>, DbErr>;
}

fn id_column() -> Expr {
	Expr::col(Alias::new(ID_FIELD))
}

fn bigint<E: Into<SimpleExpr>>(expression: E) -> SimpleExpr {
	Func::cast_as(expression, Alias::new("bigint")).into()
}

/// A [`Model`] backed by a sea-orm entity.
pub struct EntityModel<E> {
	connection: Arc<DatabaseConnection>,
	name: String,
	entity: PhantomData<E>,
}

impl<E> EntityModel<E> {
	pub fn new(connection: Arc<DatabaseConnection>, name: &str) -> Self {
		Self {
			connection,
			name: name.to_owned(),
			entity: PhantomData,
		}
	}

	pub fn connection(&self) -> &DatabaseConnection {
		self.connection.as_ref()
	}
}

#[async_trait::async_trait]
impl<E> Model for EntityModel<E>
where
	E: EntityTrait + Send + Sync,
	E::Model: Record + Send + Sync,
{
	type Record = E::Model;

	fn name(&self) -> &str {
		&self.name
	}

	async fn search(
		&self,
		domain: &Domain,
		options: &SearchOptions,
	) -> Result<Vec<i64>, DbErr> {
		let mut select = E::find()
			.select_only()
			.column_as(bigint(id_column()), ID_FIELD)
			.filter(domain.condition());

		let order = options.order.clone()
			.unwrap_or_else(|| Order::by(ID_FIELD, super::domain::Direction::Ascending));
		for (field, direction) in order.fields() {
			QueryTrait::query(&mut select)
				.order_by(Alias::new(field), direction.into());
		}

		let select = match options.offset {
			0 => select,
			offset => select.offset(offset),
		};

		select.limit(options.limit)
			.into_tuple::<i64>()
			.all(self.connection.as_ref()).await
	}

	async fn search_count(&self, domain: &Domain) -> Result<u64, DbErr> {
		E::find()
			.filter(domain.condition())
			.count(self.connection.as_ref()).await
	}

	async fn browse(&self, ids: &[i64]) -> Result<Vec<Self::Record>, DbErr> {
		if ids.is_empty() {
			return Ok(vec![]);
		}

		let mut records = E::find()
			.filter(id_column().is_in(ids.iter().copied()))
			.all(self.connection.as_ref()).await?;

		records.retain(|record| ids.contains(&record.id()));
		records.sort_by_key(|record| {
			ids.iter().position(|id| *id == record.id())
		});

		Ok(records)
	}

	async fn max_id(&self) -> Result<Option<i64>, DbErr> {
		let max = E::find()
			.select_only()
			.column_as(bigint(Func::max(id_column())), "max_id")
			.into_tuple::<Option<i64>>()
			.one(self.connection.as_ref()).await?;

		Ok(max.flatten())
	}
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeMap;

	use sea_orm::{DatabaseBackend, MockDatabase, Value};

	use super::*;
	use crate::database::entities::product;
	use crate::database::memory;

	#[tokio::test]
	async fn browse_keeps_requested_order() {
		let connection = MockDatabase::new(DatabaseBackend::Postgres)
			.append_query_results([vec![memory::product(1, "Boot"), memory::product(3, "Sandal")]])
			.into_connection();
		let model = EntityModel::<product::Entity>::new(Arc::new(connection), "product.product");

		let records = model.browse(&[3, 1]).await.unwrap();
		let ids = records.iter().map(Record::id).collect::<Vec<_>>();
		assert_eq!(ids, vec![3, 1]);
	}

	#[tokio::test]
	async fn browse_nothing_skips_query() {
		let connection = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
		let model = EntityModel::<product::Entity>::new(Arc::new(connection), "product.product");
		assert!(model.browse(&[]).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn search_returns_ids() {
		let rows = [4_i64, 9].map(|id| BTreeMap::from([("id", Value::from(id))]));
		let connection = MockDatabase::new(DatabaseBackend::Postgres)
			.append_query_results([rows.to_vec()])
			.into_connection();
		let model = EntityModel::<product::Entity>::new(Arc::new(connection), "product.product");

		let ids = model.search(&Domain::new(), &SearchOptions::window(0, 2)).await.unwrap();
		assert_eq!(ids, vec![4, 9]);
	}

	#[test]
	fn last_modified_prefers_write_date() {
		let mut record = memory::product(1, "Boot");
		assert_eq!(record.last_modified(), record.create_date);

		let written = NaiveDateTime::default() + chrono::Duration::days(2);
		record.write_date = Some(written);
		assert_eq!(record.last_modified(), written);
	}
}

use std::sync::Arc;
use std::time::Duration;

use sea_orm::{ConnectOptions, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;

use migration::Migrator;

use crate::config::CONFIG;

pub mod domain;
pub mod entities;
pub mod model;

#[cfg(test)]
pub(crate) mod memory;

pub use domain::{Direction, Domain, DomainValue, Operator, Order};
pub use model::{EntityModel, Model, Record, SearchOptions, Timestamped};

#[async_trait::async_trait]
pub trait Database: Sized + Send + Sync {
	type Error: std::fmt::Debug;
	type Connection: Send + Sync;

	async fn connect() -> Result<Self, Self::Error>;
	async fn connection(&self) -> Result<Self::Connection, Self::Error>;
}

/// A shared handle on the connection pool.
pub type Connection = Arc<DatabaseConnection>;

pub struct ShopDatabase {
	pool: Connection,
}

impl ShopDatabase {
	pub fn from_connection(pool: DatabaseConnection) -> Self {
		Self { pool: Arc::new(pool) }
	}
}

#[async_trait::async_trait]
impl Database for ShopDatabase {
	type Error = DbErr;
	type Connection = Connection;

	async fn connect() -> Result<Self, Self::Error> {
		let url = CONFIG.database_url.to_string();
		let mut connect_options = ConnectOptions::new(url);
		connect_options
			.connect_timeout(Duration::from_secs(2))
			.acquire_timeout(Duration::from_secs(2))
			.sqlx_logging(false);

		let pool = sea_orm::Database::connect(connect_options).await?;
		Migrator::up(&pool, None).await?;
		tracing::info!("database ready");
		Ok(Self::from_connection(pool))
	}

	async fn connection(&self) -> Result<Self::Connection, Self::Error> {
		Ok(Arc::clone(&self.pool))
	}
}

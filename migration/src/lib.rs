pub use sea_orm_migration::prelude::*;

mod m0_create_shop;
mod m1_listing_indices;

pub struct Migrator;

macro_rules! col {
	($name:expr) => {
		sea_orm_migration::prelude::ColumnDef::new($name).not_null()
	}
}

macro_rules! id {
	($name:expr) => {
		sea_orm_migration::prelude::ColumnDef::new($name).auto_increment().primary_key()
	}
}

use {col, id};

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
	fn migrations() -> Vec<Box<dyn MigrationTrait>> {
		vec![
			Box::new(m0_create_shop::Migration),
			Box::new(m1_listing_indices::Migration),
		]
	}
}

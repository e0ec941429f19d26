use sea_orm::entity::prelude::*;
use serde::Serialize;

use crate::database::model::{Record, Timestamped};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "category")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,
	pub title: String,
	#[sea_orm(unique)]
	pub uri: String,
	pub parent: Option<i32>,
	pub displayed_on_eshop: bool,
	pub create_date: DateTime,
	pub write_date: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "Entity",
		from = "Column::Parent",
		to = "Column::Id",
		on_update = "NoAction",
		on_delete = "SetNull"
	)]
	Parent,
	#[sea_orm(has_many = "super::product::Entity")]
	Product,
}

impl Related<super::product::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Product.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}

impl Record for Model {
	fn id(&self) -> i64 {
		self.id.into()
	}
}

impl Timestamped for Model {
	fn create_date(&self) -> DateTime {
		self.create_date
	}

	fn write_date(&self) -> Option<DateTime> {
		self.write_date
	}
}

use sea_orm::entity::prelude::*;
use serde::Serialize;

use crate::database::model::{Record, Timestamped};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "product")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,
	pub name: String,
	#[sea_orm(unique)]
	pub uri: String,
	pub displayed_on_eshop: bool,
	pub category: Option<i32>,
	pub create_date: DateTime,
	pub write_date: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::category::Entity",
		from = "Column::Category",
		to = "super::category::Column::Id",
		on_update = "NoAction",
		on_delete = "SetNull"
	)]
	Category,
}

impl Related<super::category::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Category.def()
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

use sea_orm_migration::prelude::*;

use super::{col, id};

#[derive(Iden)]
enum Category {
	Table,
	Id,
	Title,
	Uri,
	Parent,
	#[iden = "displayed_on_eshop"]
	DisplayedOnEshop,
	#[iden = "create_date"]
	CreateDate,
	#[iden = "write_date"]
	WriteDate,
}

#[derive(Iden)]
enum Product {
	Table,
	Id,
	Name,
	Uri,
	#[iden = "displayed_on_eshop"]
	DisplayedOnEshop,
	Category,
	#[iden = "create_date"]
	CreateDate,
	#[iden = "write_date"]
	WriteDate,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
	async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		let create_categories = Table::create()
			.table(Category::Table)
			.col(id!(Category::Id).integer())
			.col(col!(Category::Title).string())
			.col(col!(Category::Uri).string().unique_key())
			.col(ColumnDef::new(Category::Parent).integer())
			.col(col!(Category::DisplayedOnEshop).boolean().default(true))
			.col(col!(Category::CreateDate).timestamp().default(Expr::current_timestamp()))
			.col(ColumnDef::new(Category::WriteDate).timestamp())
			.foreign_key(
				ForeignKey::create()
					.from(Category::Table, Category::Parent)
					.to(Category::Table, Category::Id)
					.on_delete(ForeignKeyAction::SetNull)
			)
			.to_owned();

		manager.create_table(create_categories).await?;

		let create_products = Table::create()
			.table(Product::Table)
			.col(id!(Product::Id).integer())
			.col(col!(Product::Name).string())
			.col(col!(Product::Uri).string().unique_key())
			.col(col!(Product::DisplayedOnEshop).boolean().default(true))
			.col(ColumnDef::new(Product::Category).integer())
			.col(col!(Product::CreateDate).timestamp().default(Expr::current_timestamp()))
			.col(ColumnDef::new(Product::WriteDate).timestamp())
			.foreign_key(
				ForeignKey::create()
					.from(Product::Table, Product::Category)
					.to(Category::Table, Category::Id)
					.on_delete(ForeignKeyAction::SetNull)
			)
			.to_owned();

		manager.create_table(create_products).await?;

		Ok(())
	}

	async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		let drop_products = Table::drop()
			.table(Product::Table)
			.to_owned();

		manager.drop_table(drop_products).await?;

		let drop_categories = Table::drop()
			.table(Category::Table)
			.to_owned();

		manager.drop_table(drop_categories).await?;

		Ok(())
	}
}

use sea_orm_migration::prelude::*;

#[derive(Iden)]
enum Product {
	Table,
	Name,
	Category,
}

const PRODUCT_BY_NAME: &str = "product_by_name";
const PRODUCT_BY_CATEGORY: &str = "product_by_category";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
	async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		let create_product_by_name = Index::create()
			.name(PRODUCT_BY_NAME)
			.table(Product::Table)
			.col(Product::Name)
			.to_owned();

		manager.create_index(create_product_by_name).await?;

		let create_product_by_category = Index::create()
			.name(PRODUCT_BY_CATEGORY)
			.table(Product::Table)
			.col(Product::Category)
			.to_owned();

		manager.create_index(create_product_by_category).await?;

		Ok(())
	}

	async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		let drop_product_by_name = Index::drop()
			.name(PRODUCT_BY_NAME)
			.to_owned();

		manager.drop_index(drop_product_by_name).await?;

		let drop_product_by_category = Index::drop()
			.name(PRODUCT_BY_CATEGORY)
			.to_owned();

		manager.drop_index(drop_product_by_category).await?;

		Ok(())
	}
}

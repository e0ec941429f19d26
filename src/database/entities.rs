pub mod category;
pub mod product;

pub use category::Entity as Category;
pub use product::Entity as Product;

#[macro_use]
extern crate lazy_static;

pub mod cache;
pub mod config;
pub mod crumbs;
pub mod database;
pub mod files;
pub mod filter;
pub mod pagination;
pub mod routes;
pub mod search;
pub mod session;
pub mod sitemap;
pub mod slug;
pub mod urls;

pub mod auth;
pub mod header;
pub mod request;
pub mod resource;
pub mod response;

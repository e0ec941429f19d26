pub mod paginated_list;
pub mod redirect;

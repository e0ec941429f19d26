use std::path::PathBuf;

use serde::Deserialize;
use url::Url;

fn default_language() -> String {
	String::from("en_US")
}

fn default_static_folder() -> PathBuf {
	PathBuf::from("static")
}

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
	pub host: String,
	pub port: u16,
	pub database_url: Url,
	pub data_path: PathBuf,
	pub database_name: String,
	#[serde(default = "default_static_folder")]
	pub static_folder: PathBuf,
	#[serde(default)]
	pub use_x_sendfile: bool,
	#[serde(default = "default_language")]
	pub default_language: String,
	#[serde(default)]
	pub languages: Vec<String>,
	pub search_server: Option<String>,
	pub search_port: Option<u16>,
}

impl Config {
	/// Root that relative file names handed to `send_file` resolve against.
	pub fn file_root(&self) -> PathBuf {
		self.data_path.join(&self.database_name)
	}

	/// The search server address, if both host and port are configured.
	pub fn search_address(&self) -> Option<(&str, u16)> {
		match (&self.search_server, self.search_port) {
			(Some(server), Some(port)) => Some((server.as_str(), port)),
			_ => None,
		}
	}

	pub fn is_language(&self, code: &str) -> bool {
		code == self.default_language
			|| self.languages.iter().any(|language| language == code)
	}
}

lazy_static! {
	pub static ref CONFIG: Config = envy::from_env::<Config>()
		.expect("Incomplete config setup");
}

pub fn check() {
	if CONFIG.host.is_empty() {
		panic!("Missing HOST value");
	}

	if CONFIG.database_name.is_empty() {
		panic!("Missing DATABASE_NAME value");
	}

	if CONFIG.search_server.is_some() != CONFIG.search_port.is_some() {
		tracing::warn!("only one of SEARCH_SERVER and SEARCH_PORT is set, search is disabled");
	}
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
	Config {
		host: String::from("localhost"),
		port: 8000,
		database_url: Url::parse("postgres://localhost/shop").unwrap(),
		data_path: PathBuf::from("/var/lib/nereid"),
		database_name: String::from("shop"),
		static_folder: default_static_folder(),
		use_x_sendfile: false,
		default_language: default_language(),
		languages: vec![String::from("de_DE")],
		search_server: None,
		search_port: None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn search_needs_server_and_port() {
		let mut config = test_config();
		assert_eq!(config.search_address(), None);

		config.search_server = Some(String::from("localhost"));
		assert_eq!(config.search_address(), None);

		config.search_port = Some(9308);
		assert_eq!(config.search_address(), Some(("localhost", 9308)));
	}

	#[test]
	fn file_root_joins_database_name() {
		let config = test_config();
		assert_eq!(config.file_root(), PathBuf::from("/var/lib/nereid/shop"));
	}

	#[test]
	fn known_languages() {
		let config = test_config();
		assert!(config.is_language("en_US"));
		assert!(config.is_language("de_DE"));
		assert!(!config.is_language("products"));
	}
}

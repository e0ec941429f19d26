//! Breadcrumbs for records arranged in a tree.

use crate::urls::{BuildError, UrlBuilder};

pub const HOME_ENDPOINT: &str = "website.home";
pub const HOME_TITLE: &str = "Home";

/// A record that can appear in a breadcrumb trail.
#[async_trait::async_trait]
pub trait CrumbNode: Sized + Send + Sync {
	fn id(&self) -> i64;
	fn uri(&self) -> &str;
	fn title(&self) -> &str;

	/// The node one level up, if any.
	async fn parent(&self) -> Option<Self>;
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Crumb {
	pub url: String,
	pub title: String,
}

#[derive(Debug, Clone)]
pub struct CrumbOptions {
	pub add_home: bool,
	/// Levels of the tree to climb, counting the starting node.
	pub max_depth: usize,
	/// Nodes at which the trail stops, after being included.
	pub root_ids: Vec<i64>,
}

impl Default for CrumbOptions {
	fn default() -> Self {
		Self {
			add_home: true,
			max_depth: 10,
			root_ids: vec![],
		}
	}
}

/// Breadcrumbs from the top of the tree down to `node`, each linking to
/// `endpoint` with the node's `uri`.
pub async fn make_crumbs<N: CrumbNode>(
	node: N,
	endpoint: &str,
	urls: &UrlBuilder,
	options: &CrumbOptions,
) -> Result<Vec<Crumb>, BuildError> {
	let mut crumbs = Vec::new();
	let mut current = Some(node);

	while let Some(node) = current.take() {
		if crumbs.len() >= options.max_depth {
			break;
		}

		crumbs.push(Crumb {
			url: urls.url_for(endpoint, [("uri", node.uri())])?,
			title: node.title().to_owned(),
		});

		if options.root_ids.contains(&node.id()) {
			break;
		}
		current = node.parent().await;
	}

	if options.add_home {
		const NO_VALUES: [(&str, &str); 0] = [];
		crumbs.push(Crumb {
			url: urls.url_for(HOME_ENDPOINT, NO_VALUES)?,
			title: String::from(HOME_TITLE),
		});
	}

	crumbs.reverse();
	Ok(crumbs)
}

use std::net::IpAddr;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use warp::Filter;

use nereid::config::{self, CONFIG};
use nereid::database::{Database, ShopDatabase};
use nereid::routes::{self, Shop};

#[tokio::main]
async fn main() {
	tracing_subscriber::registry()
		.with(fmt::layer())
		.with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.init();

	config::check();

	let database = ShopDatabase::connect().await
		.expect("Failed to connect to database");
	let shop = Shop::new(&CONFIG, database);

	let routes = routes::routes(&shop)
		.recover(routes::recover)
		.with(warp::trace::request());

	let address = CONFIG.host.parse::<IpAddr>()
		.unwrap_or_else(|_| IpAddr::from([127, 0, 0, 1]));
	tracing::info!(%address, port = CONFIG.port, "listening");

	warp::serve(routes)
		.run((address, CONFIG.port))
		.await;
}

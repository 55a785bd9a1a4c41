mod middleware;
mod paging;
mod products;
mod schema;
mod transaction;

use crate::{
    middleware::middleware, paging::paging, products::products, schema::schema,
    transaction::transaction,
};
use dorm::{DataSourceConfig, Dorm, Result};
use log::LevelFilter;
use std::env;

pub const DATA_SOURCE: &str = "default";

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// A fresh [`Dorm`] with the single data source [`DATA_SOURCE`] pointing at `url`.
pub fn connect(url: &str) -> Result<Dorm> {
    let dorm = Dorm::new();
    dorm.add_data_source(DATA_SOURCE, DataSourceConfig::from_url(url)?)?;
    Ok(dorm)
}

/// Runs every scenario against the MySQL server at `url`.
pub async fn execute_tests(url: &str) {
    let dorm = connect(url).expect("Could not configure the data source");
    products(&dorm).await;
    paging(&dorm).await;
    transaction(&dorm).await;
    schema(&dorm).await;
    dorm.close().await.expect("Could not close the data sources");

    let dorm = connect(url).expect("Could not configure the data source");
    middleware(&dorm).await;
    dorm.close().await.expect("Could not close the data sources");
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}

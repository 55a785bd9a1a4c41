mod config;
mod dorm;
mod middleware;

pub use config::*;
pub use dorm::*;
pub use dorm_core::*;
pub use dorm_mysql::*;
pub use middleware::*;

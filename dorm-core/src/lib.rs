mod condition;
mod connection;
mod error;
mod executor;
mod filter;
mod reusable;
mod row;
mod schema;
mod statement;
mod transaction;
mod util;
mod value;
mod where_clause;

pub use ::anyhow::Context;
pub use condition::*;
pub use connection::*;
pub use error::*;
pub use executor::*;
pub use filter::*;
pub use reusable::*;
pub use row::*;
pub use schema::*;
pub use statement::*;
pub use transaction::*;
pub use util::*;
pub use value::*;
pub use where_clause::*;
pub use ::anyhow;
pub use ::futures::future;

pub type Result<T> = anyhow::Result<T>;

mod connection;
mod data_source;
mod inspector;
mod row_wrap;
mod value_wrap;

pub use connection::*;
pub use data_source::*;
pub use inspector::*;
pub(crate) use row_wrap::*;
pub(crate) use value_wrap::*;

pub mod bridge;
pub mod config;
pub mod discovery;
pub mod error;
pub mod eval;
pub mod executor;
pub mod fragment;
pub mod logging;
pub mod operators;
pub mod optimizer;
pub mod query;
pub mod reader;
pub mod registry;
pub mod schema;
pub mod sql;
pub mod types;

pub use config::EngineConfig;
pub use error::{Result, TabqlError};
pub use query::{Backend, Query, QueryResult};
pub use schema::Schema;
pub use types::{LogicalType, Row, Value};

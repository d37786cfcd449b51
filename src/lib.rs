pub mod config;
pub mod error;
pub mod fetch;
pub mod parser;
pub mod runner;
pub mod search;

pub use config::{Category, CategoryTable};
pub use error::ExtractError;
pub use parser::extract_store;
pub use parser::record::StoreRecord;

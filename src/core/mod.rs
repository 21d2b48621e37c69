pub mod config;
pub mod note;
pub mod paths;
pub mod schema;
pub mod store;
pub mod tag;

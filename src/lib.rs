use db::DatabaseError;

pub mod db;
pub mod os;
pub mod pagination;

pub type Result<T> = std::result::Result<T, DatabaseError>;

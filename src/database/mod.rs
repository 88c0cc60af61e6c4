mod context;
mod versions;

pub type DBResult<T> = sqlx::Result<T>;

pub use context::Database;

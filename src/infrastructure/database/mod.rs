pub mod connection_pool;

pub use connection_pool::ConnectionPool;

use crate::shared::error::AppError;
use chrono::{DateTime, Utc};

pub(crate) fn millis_to_datetime(value: i64, column: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::<Utc>::from_timestamp_millis(value).ok_or_else(|| {
        AppError::DeserializationError(format!("Invalid timestamp in {column}: {value}"))
    })
}

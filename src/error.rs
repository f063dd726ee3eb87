use thiserror::Error;

/// SQLSTATE raised when `lock_timeout` expires.
const PG_LOCK_NOT_AVAILABLE: &str = "55P03";
/// SQLSTATE raised by an exclusion constraint (overlapping shows).
const PG_EXCLUSION_VIOLATION: &str = "23P01";

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input: empty seat set, unknown catalog reference, bad price.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Scheduling overlap or an update forbidden by existing references.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Showroom template does not cover its declared capacity exactly once.
    #[error("seat template mismatch: {0}")]
    TemplateMismatch(String),

    /// Requested seats that do not belong to the show.
    #[error("seats {seat_ids:?} do not belong to show {show_id}")]
    InvalidSeat { show_id: i64, seat_ids: Vec<i64> },

    /// Requested seats that are already held or booked.
    #[error("seats {seat_ids:?} are no longer available")]
    SeatUnavailable { seat_ids: Vec<i64> },

    #[error("timed out waiting for exclusive access to seats")]
    LockTimeout,

    /// Referenced show, pricing or booking is missing.
    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn not_found(entity: &'static str, key: impl std::fmt::Display) -> Self {
        Error::NotFound { entity, key: key.to_string() }
    }

    /// Errors the caller may resolve by retrying the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::LockTimeout)
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                Some(PG_LOCK_NOT_AVAILABLE) => return Error::LockTimeout,
                Some(PG_EXCLUSION_VIOLATION) => {
                    return Error::Conflict("show overlaps an existing show in the showroom".to_string())
                }
                _ => {}
            }
        }
        Error::Database(err)
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Error::Validation(errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_stays_a_database_error() {
        let err = Error::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, Error::Database(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn unavailable_seats_are_listed_in_message() {
        let err = Error::SeatUnavailable { seat_ids: vec![3, 7] };
        assert_eq!(err.to_string(), "seats [3, 7] are no longer available");
    }
}

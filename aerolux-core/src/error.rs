/// Failure taxonomy shared by the booking engine and its repositories.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("insufficient inventory: requested {requested}, available {available}")]
    InventoryUnavailable { requested: i32, available: i32 },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("persistence failure: {0}")]
    Persistence(String),
}

pub type BookingResult<T> = Result<T, BookingError>;

impl BookingError {
    pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        BookingError::NotFound(format!("{} {}", resource, id))
    }
}

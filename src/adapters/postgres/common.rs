//! Row conversion helpers shared by the PostgreSQL repositories.

use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, UserId};

/// User ids are UUID columns; the identity provider issues UUID subjects.
pub(super) fn parse_user_id_as_uuid(user_id: &UserId) -> Result<Uuid, DomainError> {
    Uuid::parse_str(user_id.as_str()).map_err(|e| {
        DomainError::new(
            ErrorCode::ValidationFailed,
            format!("User ID must be a valid UUID: {}", e),
        )
    })
}

pub(super) fn user_id_from_uuid(id: Uuid) -> Result<UserId, DomainError> {
    UserId::new(id.to_string()).map_err(|e| {
        DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
    })
}

/// Maps a stored string column through a domain parser.
pub(super) fn parse_column<'a, T, E: std::fmt::Display>(
    column: &str,
    value: &'a str,
    parse: impl FnOnce(&'a str) -> Result<T, E>,
) -> Result<T, DomainError> {
    parse(value).map_err(|e| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid {} '{}': {}", column, value, e),
        )
    })
}

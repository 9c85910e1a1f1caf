use thiserror::Error as ThisError;

use crate::schema::Uuid;

/// Failure taxonomy for payload validation and persistence.
///
/// Every variant except `Query` is a client error; `status` gives the
/// HTTP status class the routing layer should answer with.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{0}` has an invalid type")]
    InvalidType(&'static str),

    #[error("{entity} does not exist")]
    NotFound {
        entity: &'static str,
        id: Option<Uuid>,
    },

    #[error("duplicate entry for `{0}`")]
    DuplicateEntry(&'static str),

    #[error("field `{field}` must be within {min}..={max}")]
    OutOfRange {
        field: &'static str,
        min: i32,
        max: i32,
    },

    #[error("a user cannot follow themself")]
    SelfReferenceNotAllowed,

    #[error("no {0} exists to delete")]
    Conflict(&'static str),

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl Error {
    pub fn status(&self) -> u16 {
        match self {
            Error::MissingField(_)
            | Error::InvalidType(_)
            | Error::DuplicateEntry(_)
            | Error::OutOfRange { .. }
            | Error::SelfReferenceNotAllowed => 400,
            Error::NotFound { .. } => 404,
            Error::Conflict(_) => 409,
            Error::Query(_) => 500,
        }
    }

    /// The payload field the error points at, when there is one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Error::MissingField(field) | Error::InvalidType(field) => Some(field),
            Error::DuplicateEntry(field) => Some(field),
            Error::OutOfRange { field, .. } => Some(field),
            _ => None,
        }
    }
}

#[derive(Debug, ThisError)]
#[error("{info}")]
pub struct QueryError {
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Configuration(e) => Self::new(format!("{e}")),
            sqlx::Error::Database(e) => Self::new(format!("{e}")),
            sqlx::Error::Io(e) => Self::new(format!("{e}")),
            sqlx::Error::Tls(e) => Self::new(format!("{e}")),
            sqlx::Error::Protocol(e) => Self::new(format!("{e}")),
            sqlx::Error::RowNotFound => Self::new(format!("RowNotFound")),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::new(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnNotFound(e) => Self::new(format!("{e}")),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::Decode(e) => Self::new(format!("{e}")),
            sqlx::Error::PoolTimedOut => Self::new(format!("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(format!("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(format!("Worker crashed")),
            _ => Self::new(format!("Unknown error")),
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(value: sqlx::Error) -> Self {
        Error::Query(QueryError::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_distinguishes_error_classes() {
        assert_eq!(Error::MissingField("ingredients").status(), 400);
        assert_eq!(Error::DuplicateEntry("tags").status(), 400);
        assert_eq!(
            Error::NotFound {
                entity: "ingredient",
                id: Some(7)
            }
            .status(),
            404
        );
        assert_eq!(Error::Conflict("favorite").status(), 409);
        assert_eq!(Error::SelfReferenceNotAllowed.status(), 400);
    }

    #[test]
    fn field_names_the_offending_field() {
        assert_eq!(Error::MissingField("amount").field(), Some("amount"));
        assert_eq!(
            Error::OutOfRange {
                field: "cooking_time",
                min: 1,
                max: 3600
            }
            .field(),
            Some("cooking_time")
        );
        assert_eq!(Error::SelfReferenceNotAllowed.field(), None);
    }
}

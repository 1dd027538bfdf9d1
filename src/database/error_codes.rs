//! PostgreSQL Error Codes
//!
//! SQLSTATE constants for the conditions this service reacts to.
//!
//! Full list: <https://www.postgresql.org/docs/current/errcodes-appendix.html>

/// PostgreSQL SQLSTATE error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PgErrorCode;

impl PgErrorCode {
    /// Unique violation (duplicate key) - Code 23505
    pub const UNIQUE_VIOLATION: &'static str = "23505";

    /// Undefined table ("relation does not exist") - Code 42P01
    pub const UNDEFINED_TABLE: &'static str = "42P01";

    pub fn is_unique_violation(code: &str) -> bool {
        code == Self::UNIQUE_VIOLATION
    }

    pub fn is_undefined_table(code: &str) -> bool {
        code == Self::UNDEFINED_TABLE
    }
}

/// SQLSTATE of a database error, if the error came from the server
pub fn sqlstate(error: &sqlx::Error) -> Option<String> {
    match error {
        sqlx::Error::Database(db_error) => db_error.code().map(|c| c.into_owned()),
        _ => None,
    }
}

/// True when the error is a unique-constraint violation
pub fn is_unique_violation(error: &sqlx::Error) -> bool {
    sqlstate(error).is_some_and(|code| PgErrorCode::is_unique_violation(&code))
}

/// True when the statement referenced a table that does not exist
pub fn is_undefined_table(error: &sqlx::Error) -> bool {
    sqlstate(error).is_some_and(|code| PgErrorCode::is_undefined_table(&code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_matchers() {
        assert!(PgErrorCode::is_unique_violation("23505"));
        assert!(!PgErrorCode::is_unique_violation("23503"));
        assert!(PgErrorCode::is_undefined_table("42P01"));
    }

    #[test]
    fn test_non_database_errors_have_no_sqlstate() {
        let err = sqlx::Error::RowNotFound;
        assert_eq!(sqlstate(&err), None);
        assert!(!is_unique_violation(&err));
        assert!(!is_undefined_table(&err));
    }
}

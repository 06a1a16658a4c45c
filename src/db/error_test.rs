//! Tests for database error types.

use crate::db::{DbError, DbResult};

#[test]
fn not_found_error_displays_correctly() {
    let err = DbError::not_found("Server", 42);
    assert_eq!(err.to_string(), "Entity not found: Server with id '42'");
}

#[test]
fn already_exists_error_displays_correctly() {
    let err = DbError::AlreadyExists {
        entity_type: "Hoster".to_string(),
        key: "name 'Hetzner'".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "Entity already exists: Hoster with name 'Hetzner'"
    );
}

#[test]
fn invalid_data_error_displays_correctly() {
    let err = DbError::InvalidData {
        message: "ports column is not valid JSON".to_string(),
        help: "Re-save the service".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "Invalid data: ports column is not valid JSON"
    );
}

#[test]
fn constraint_error_displays_correctly() {
    let err = DbError::Constraint {
        message: "FOREIGN KEY constraint failed".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "Constraint violation: FOREIGN KEY constraint failed"
    );
}

#[test]
fn db_result_propagates_with_question_mark() {
    fn inner() -> DbResult<()> {
        Err(DbError::Validation {
            message: "bad".to_string(),
        })
    }

    fn outer() -> DbResult<u8> {
        inner()?;
        Ok(1)
    }

    assert!(matches!(outer(), Err(DbError::Validation { .. })));
}

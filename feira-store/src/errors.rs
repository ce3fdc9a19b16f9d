use feira_core::EngineError;

/// Maps driver faults into the engine taxonomy. A unique violation means a
/// conditional insert lost its race (e.g. a second order for the same
/// quote), so it surfaces as a conflict rather than a storage fault.
pub fn map_sqlx(err: sqlx::Error) -> EngineError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return EngineError::conflict(format!("unique constraint violated: {db_err}"));
        }
    }
    EngineError::storage(err.to_string())
}

use crate::application::repos::RepoError;

/// Translate a sqlx failure into the repository error taxonomy. Postgres
/// surfaces constraint problems as driver messages; the well-known fragments
/// below are the classification signal.
pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    let db = match err {
        sqlx::Error::RowNotFound => return RepoError::NotFound,
        sqlx::Error::Database(db) => db,
        other => return RepoError::from_persistence(other),
    };

    let message = db.message().to_string();
    if message.contains("duplicate key") {
        RepoError::Duplicate {
            constraint: db.constraint().unwrap_or("unknown").to_string(),
        }
    } else if message.contains("violates foreign key constraint")
        || message.contains("invalid input syntax")
    {
        RepoError::InvalidInput { message }
    } else if message.contains("violates") {
        RepoError::Integrity { message }
    } else if message.contains("canceling statement due to user request") {
        RepoError::Timeout
    } else {
        RepoError::Persistence(message)
    }
}

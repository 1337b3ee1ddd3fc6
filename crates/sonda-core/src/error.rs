use thiserror::Error;

/// Shared error taxonomy for the Sonda crates.
///
/// Lookup-miss variants enumerate the valid alternatives so callers can
/// self-correct without a second round trip. Connection failures keep their
/// original cause attached.
#[derive(Debug, Error)]
pub enum Error {
    /// Schema or repositories accessed before discovery completed.
    #[error("engine not initialized: call initialize() first")]
    NotInitialized,

    /// Table name lookup miss.
    #[error("table not found: `{name}` (known tables: {})", format_names(.available))]
    TableNotFound {
        name: String,
        available: Vec<String>,
    },

    /// Column name lookup miss.
    #[error("column not found on `{table}`: `{name}` (known columns: {})", format_names(.available))]
    ColumnNotFound {
        table: String,
        name: String,
        available: Vec<String>,
    },

    /// Unknown relationship name passed to a relationship-loading call.
    #[error("relationship not found on `{table}`: `{name}` (known relationships: {})", format_names(.available))]
    RelationshipNotFound {
        table: String,
        name: String,
        available: Vec<String>,
    },

    /// Update addressed a primary key that matched no row.
    #[error("no row in `{table}` with key {key}")]
    RowNotFound { table: String, key: String },

    /// Introspection or CRUD I/O failure from the execution collaborator.
    #[error("connection error: {context}")]
    Connection {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// Malformed input to create/update or a malformed key value.
    #[error("validation error: {0}")]
    Validation(String),

    /// The discovered schema violates internal invariants.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// A requested capability is not supported by this dialect.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl Error {
    /// Wrap an I/O failure from the database collaborator, keeping the cause.
    pub fn connection(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Connection {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

fn format_names(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

/// Convenience alias for results returned by Sonda crates.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_not_found_lists_alternatives() {
        let err = Error::TableNotFound {
            name: "user".to_string(),
            available: vec!["users".to_string(), "posts".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("`user`"));
        assert!(message.contains("users, posts"));
    }

    #[test]
    fn empty_alternatives_render_as_none() {
        let err = Error::RelationshipNotFound {
            table: "users".to_string(),
            name: "ghost".to_string(),
            available: Vec::new(),
        };
        assert!(err.to_string().contains("none"));
    }

    #[test]
    fn connection_error_preserves_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = Error::connection("liveness probe failed", io);
        assert!(std::error::Error::source(&err).is_some());
    }
}

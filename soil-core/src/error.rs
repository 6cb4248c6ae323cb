/// Boxed error carried as the source of a tool failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum SoilError {
    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Model error: {0}")]
    Model(String),

    /// A tool failed. The original error is kept as the source so callers can
    /// downcast to the concrete failure.
    #[error("Tool error ({name}): {source}")]
    Tool {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("Memory error: {0}")]
    Memory(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl SoilError {
    /// Wrap an error (or a plain message) raised by the named tool.
    pub fn tool(name: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Tool { name: name.into(), source: source.into() }
    }

    /// Returns the tool failure's source as `E`, if this is a tool error of that type.
    pub fn tool_source<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Tool { source, .. } => source.downcast_ref::<E>(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SoilError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("backend unreachable")]
    struct BackendDown;

    #[test]
    fn test_error_display() {
        let err = SoilError::Agent("test error".to_string());
        assert_eq!(err.to_string(), "Agent error: test error");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SoilError = io_err.into();
        assert!(matches!(err, SoilError::Io(_)));
    }

    #[test]
    fn test_tool_error_from_message() {
        let err = SoilError::tool("divide", "missing argument 'b'");
        assert_eq!(err.to_string(), "Tool error (divide): missing argument 'b'");
    }

    #[test]
    fn test_tool_error_keeps_source() {
        let err = SoilError::tool("query_database", BackendDown);
        assert!(err.tool_source::<BackendDown>().is_some());
        assert!(std::error::Error::source(&err).is_some());

        let other = SoilError::Model("x".into());
        assert!(other.tool_source::<BackendDown>().is_none());
    }
}

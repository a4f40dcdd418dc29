// Error taxonomy for backend queries and cluster volume listing

/// Failure of one backend query. The caller withholds that query's data for the cycle.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Connection refused, timeout, or body read failure.
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx status from the backend.
    #[error("backend HTTP error: status={status}, body={body}")]
    Status { status: u16, body: String },

    /// Body is not the expected JSON shape.
    #[error("malformed backend response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Well-formed body whose `status` is not "success".
    #[error("backend reported status {status:?}")]
    Backend { status: String },
}

impl QueryError {
    /// Coarse kind used in logs: "transport" or "parse".
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::Transport(_) | QueryError::Status { .. } => "transport",
            QueryError::Parse(_) | QueryError::Backend { .. } => "parse",
        }
    }
}

/// Failure to list volumes from the cluster API.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("cluster API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("cluster API HTTP error: status={status}, body={body}")]
    Status { status: u16, body: String },

    #[error("malformed volume list: {0}")]
    Parse(#[from] serde_json::Error),

    /// In-cluster settings (service host, token) are unavailable.
    #[error("cluster client configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_error_kinds() {
        let status = QueryError::Status {
            status: 503,
            body: String::new(),
        };
        assert_eq!(status.kind(), "transport");
        let backend = QueryError::Backend {
            status: "error".into(),
        };
        assert_eq!(backend.kind(), "parse");
        let parse: QueryError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(parse.kind(), "parse");
        assert!(parse.to_string().starts_with("malformed backend response"));
    }
}

//! Error types for miniauction
//!
//! Business rejections (auction closed, bid too low, not leader) are not
//! errors: they travel as a FAIL outcome. These variants cover the failures
//! that sit underneath that, mostly peers and configuration.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Role Errors ===
    #[error("Not leader: node {0} is a follower")]
    NotLeader(String),

    // === Network Errors ===
    #[error("gRPC error: {0}")]
    Grpc(#[from] tonic::Status),

    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    // === Config Errors ===
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Generic ===
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Operation timeout: {0}")]
    Timeout(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Is this a retryable error?
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Timeout(_) | Error::ConnectionFailed(_) | Error::Transport(_) => true,
            Error::Grpc(status) => matches!(
                status.code(),
                tonic::Code::Unavailable | tonic::Code::DeadlineExceeded
            ),
            _ => false,
        }
    }

    /// Convert to gRPC status for RPC responses
    pub fn to_grpc_status(&self) -> tonic::Status {
        use tonic::Code;
        match self {
            Error::NotLeader(_) => tonic::Status::new(Code::FailedPrecondition, self.to_string()),
            Error::InvalidConfig(_) | Error::Config(_) => {
                tonic::Status::new(Code::InvalidArgument, self.to_string())
            }
            Error::Timeout(_) => tonic::Status::new(Code::DeadlineExceeded, self.to_string()),
            Error::ConnectionFailed(_) | Error::Transport(_) => {
                tonic::Status::new(Code::Unavailable, self.to_string())
            }
            Error::Grpc(status) => status.clone(),
            _ => tonic::Status::new(Code::Internal, self.to_string()),
        }
    }
}

// Implement From for common error types
impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Other(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_leader_maps_to_failed_precondition() {
        let status = Error::NotLeader("2".into()).to_grpc_status();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);
        assert!(status.message().contains("node 2"));
    }

    #[test]
    fn test_grpc_status_passes_through() {
        let status = Error::Grpc(tonic::Status::unavailable("down")).to_grpc_status();
        assert_eq!(status.code(), tonic::Code::Unavailable);
        assert_eq!(status.message(), "down");
    }

    #[test]
    fn test_retryable() {
        assert!(Error::Timeout("peer".into()).is_retryable());
        assert!(Error::Grpc(tonic::Status::unavailable("x")).is_retryable());
        assert!(!Error::Grpc(tonic::Status::failed_precondition("x")).is_retryable());
        assert!(!Error::NotLeader("1".into()).is_retryable());
        assert!(!Error::InvalidConfig("bad".into()).is_retryable());
    }
}

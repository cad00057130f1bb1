#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Network failure: {0}")]
    Network(String),

    #[error("Server answered with status {0}")]
    Status(u16),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Maps a non-success HTTP status to an error
    pub fn from_status(status: u16) -> Error {
        match status {
            401 | 403 => Error::PermissionDenied,
            s => Error::Status(s),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Status(s) => Some(*s),
            Error::PermissionDenied => Some(403),
            Error::Network(_) | Error::InvalidResponse(_) => None,
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Error::PermissionDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(Error::from_status(401), Error::PermissionDenied);
        assert_eq!(Error::from_status(403), Error::PermissionDenied);
        assert_eq!(Error::from_status(500), Error::Status(500));
        assert_eq!(Error::from_status(404).status_code(), Some(404));
        assert!(!Error::Network(String::from("reset")).is_permission_denied());
    }
}

use solvelink_transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("connection already registered: {0}")]
    DuplicateConnection(String),

    #[error("unknown connection: {0}")]
    UnknownConnection(String),

    #[error("failed to open {url}: {source}")]
    Open {
        url: String,
        #[source]
        source: TransportError,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;

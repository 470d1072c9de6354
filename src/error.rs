use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The body did not have the expected `{ success, data }` shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The server answered `success: false`.
    #[error("rejected by server: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum PushError {
    #[error("invalid push url: {0}")]
    Url(#[from] url::ParseError),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("connection closed before namespace handshake")]
    Closed,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("no data directory available")]
    NoDataDir,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::ser::Error),
}

/// Contact form validation failures, one per rule.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("El nombre es obligatorio")]
    MissingNombre,

    #[error("La cédula o RUT es obligatorio")]
    MissingCedula,

    #[error("El teléfono es obligatorio")]
    MissingTelefono,

    #[error("El email es obligatorio")]
    MissingEmail,

    #[error("Por favor ingresa un email válido")]
    InvalidEmail,

    #[error("El comentario es obligatorio")]
    MissingComentario,

    #[error("El comentario no puede exceder {max} caracteres")]
    ComentarioTooLong { max: usize },
}

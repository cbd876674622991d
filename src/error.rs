use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum BridgeError {
    #[error("Unrecognized pilight frame: {0}")]
    Classification(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No connection")]
    NotConnected,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Conversion failed: {0}")]
    Conversion(String),

    #[error("Characteristic {0} is not exposed by this accessory")]
    UnsupportedCharacteristic(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),

    #[error(transparent)]
    WebSocketError(#[from] tokio_tungstenite::tungstenite::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

//! Error types for the hpke-chat handshake and exchange.

use std::io;

use thiserror::Error;

use crate::communicator::ChannelState;

/// Result type alias for exchange operations
pub type Result<T, E = ChatError> = std::result::Result<T, E>;

/// Errors raised by the wire codec
#[derive(Debug, Error)]
pub enum CodecError {
    /// Underlying stream failed or was closed
    #[error("transport I/O failed: {0}")]
    Io(#[from] io::Error),

    /// Frame contents could not be decoded
    #[error("malformed frame: {0}")]
    Decode(String),

    /// Length prefix exceeds the configured bound
    #[error("frame of {len} bytes exceeds limit of {max} bytes")]
    FrameTooLarge { len: usize, max: usize },

    /// Packet carried a type this side does not understand
    #[error("unknown packet type {0}")]
    UnknownPacketType(u8),
}

/// Errors that abort a handshake before a `Communicator` exists
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// Reading from or writing to the channel failed
    #[error("transport failure during handshake: {0}")]
    Transport(#[source] io::Error),

    /// Peer sent bytes that do not form a valid frame
    #[error("malformed handshake message: {0}")]
    Decode(String),

    /// Peer public key did not parse for the configured KEM
    #[error("invalid peer public key: {0}")]
    InvalidKey(String),

    /// HPKE context setup failed
    #[error("HPKE setup failed: {0}")]
    Crypto(String),

    /// Configuration does not match the compiled suite
    #[error("configuration error: {0}")]
    Config(String),
}

impl HandshakeError {
    /// Transport failures may succeed on a fresh connection; everything else
    /// points at a misbehaving or misconfigured peer.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HandshakeError::Transport(_))
    }
}

impl From<CodecError> for HandshakeError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Io(e) => HandshakeError::Transport(e),
            other => HandshakeError::Decode(other.to_string()),
        }
    }
}

/// AEAD failures on an established channel
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Sealing failed; only happens on context misuse
    #[error("seal failed: {0}")]
    SealFailure(String),

    /// Ciphertext did not authenticate
    #[error("open failed: {0}")]
    OpenFailure(String),
}

/// Errors from the post-handshake message exchange
#[derive(Debug, Error)]
pub enum ChatError {
    /// Reading from or writing to the channel failed
    #[error("transport failure: {0}")]
    Transport(#[source] io::Error),

    /// Peer sent bytes that do not form a valid packet
    #[error("malformed packet: {0}")]
    Decode(String),

    /// Packet type is not one this side accepts
    #[error("unknown packet type {0}")]
    UnknownPacketType(u8),

    /// Seal or open failed
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Operation is not allowed in the current channel state
    #[error("cannot {operation} in state {state:?}")]
    InvalidState {
        state: ChannelState,
        operation: &'static str,
    },

    /// Caller-supplied plaintext source failed
    #[error("failed to read outgoing message: {0}")]
    Input(#[source] io::Error),
}

impl ChatError {
    /// True when the failure indicates tampering or a key mismatch rather than
    /// an ordinary I/O problem.
    pub fn is_security_event(&self) -> bool {
        matches!(self, ChatError::Crypto(CryptoError::OpenFailure(_)))
    }
}

impl From<CodecError> for ChatError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Io(e) => ChatError::Transport(e),
            CodecError::UnknownPacketType(t) => ChatError::UnknownPacketType(t),
            other => ChatError::Decode(other.to_string()),
        }
    }
}

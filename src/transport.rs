//! TCP transport for the two roles.

use std::net::{TcpListener, TcpStream};

use tracing::info;

use crate::error::HandshakeError;
use crate::types::ChannelConfig;

/// Dial the responder at `config.host:config.port`
pub fn connect(config: &ChannelConfig) -> Result<TcpStream, HandshakeError> {
    let addr = format!("{}:{}", config.host, config.port);
    let stream = TcpStream::connect(&addr).map_err(HandshakeError::Transport)?;
    info!(%addr, "connected to responder");
    Ok(stream)
}

/// Listen on all interfaces at `config.port` and accept a single peer
pub fn accept(config: &ChannelConfig) -> Result<TcpStream, HandshakeError> {
    let listener =
        TcpListener::bind(("0.0.0.0", config.port)).map_err(HandshakeError::Transport)?;
    accept_on(&listener)
}

/// Accept a single peer on an already bound listener
pub fn accept_on(listener: &TcpListener) -> Result<TcpStream, HandshakeError> {
    let (stream, peer) = listener.accept().map_err(HandshakeError::Transport)?;
    info!(%peer, "accepted initiator");
    Ok(stream)
}

//! # hpke-chat
//!
//! A two-peer channel built from a single HPKE handshake, used to exchange
//! exactly one encrypted message in each direction.
//!
//! ## Features
//!
//! - DHKEM(P-384, HKDF-SHA384) ephemeral key pairs, one per handshake
//! - HKDF-SHA384 key schedule with a shared context-binding label
//! - AES-256-GCM sealing with fixed associated data
//! - Length-prefixed framing over any `Read + Write` stream
//! - Explicit per-role state machine for the message exchange
//!
//! Each peer acts as an HPKE sender toward the other, so each direction has
//! its own encapsulation and its own AEAD context.
//!
//! ## Example
//!
//! ```rust,ignore
//! use hpke_chat::{initiator_handshake, transport, ChannelConfig};
//!
//! let config = ChannelConfig::default();
//! let stream = transport::connect(&config)?;
//! let channel = initiator_handshake(stream, &config)?;
//! channel.send_message(b"hello")?;
//! let reply = channel.receive_message()?;
//! ```

mod codec;
mod communicator;
mod crypto;
mod error;
mod handshake;
pub mod transport;
mod types;

pub use codec::Codec;
pub use communicator::{ChannelState, Communicator};
pub use crypto::{
    fingerprint, parse_public_key, setup_opener, setup_sealer, Aead, Kdf, Kem, KeyPair, Opener,
    PrivateKey, PublicKey, Sealer, SuiteId,
};
pub use error::{ChatError, CodecError, CryptoError, HandshakeError, Result};
pub use handshake::{handshake, initiator_handshake, responder_handshake};
pub use types::{
    ChannelConfig, Packet, PacketType, Role, AEAD_TAG_LEN, DEFAULT_AAD, DEFAULT_HOST,
    DEFAULT_INFO, DEFAULT_MAX_FRAME_LEN, DEFAULT_PORT,
};

//! Constants and types for the hpke-chat protocol.

use serde::{Deserialize, Serialize};

use crate::crypto::SuiteId;
use crate::error::HandshakeError;

/// Default TCP port the responder listens on
pub const DEFAULT_PORT: u16 = 4444;

/// Default host the initiator connects to
pub const DEFAULT_HOST: &str = "localhost";

/// Default HPKE context-binding label
pub const DEFAULT_INFO: &[u8] = b"";

/// Default associated data bound into every seal/open
pub const DEFAULT_AAD: &[u8] = b"";

/// Upper bound on a single frame, 1 MiB
pub const DEFAULT_MAX_FRAME_LEN: usize = 1 << 20;

/// AES-256-GCM tag size
pub const AEAD_TAG_LEN: usize = 16;

/// Which side of the handshake this peer plays
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Connects out, reads the peer key first, sends the first message
    Initiator,
    /// Accepts, sends its key first, answers the first message
    Responder,
}

impl Role {
    /// `server` selects the responder; anything else is the initiator.
    pub fn from_arg(arg: &str) -> Self {
        if arg == "server" {
            Role::Responder
        } else {
            Role::Initiator
        }
    }
}

/// Packet discriminator. Only one variant exists on the wire today.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    EncryptedPacket = 0,
}

impl TryFrom<u8> for PacketType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PacketType::EncryptedPacket),
            other => Err(other),
        }
    }
}

/// Application packet carrying AEAD ciphertext
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    pub packet_type: PacketType,
    /// Ciphertext including the authentication tag
    pub body: Vec<u8>,
}

impl Packet {
    pub fn encrypted(body: Vec<u8>) -> Self {
        Self {
            packet_type: PacketType::EncryptedPacket,
            body,
        }
    }
}

/// Packet as it appears inside a frame
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct WirePacket {
    /// Packet type
    #[serde(rename = "t")]
    pub packet_type: u8,
    /// Base64-encoded ciphertext
    #[serde(rename = "b")]
    pub body: String,
}

/// Channel parameters shared by both peers out-of-band.
///
/// Defaults: suite DHKEM(P-384, HKDF-SHA384) / HKDF-SHA384 / AES-256-GCM,
/// empty `info`, empty `aad`, `localhost:4444`, 1 MiB frame limit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelConfig {
    /// HPKE algorithm identifiers; must match the compiled suite
    pub suite: SuiteId,
    /// Context-binding label mixed into key derivation
    pub info: Vec<u8>,
    /// Associated data for every seal/open
    pub aad: Vec<u8>,
    /// Host the initiator connects to
    pub host: String,
    /// Port the responder listens on and the initiator dials
    pub port: u16,
    /// Largest frame the codec will accept
    pub max_frame_len: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            suite: SuiteId::compiled(),
            info: DEFAULT_INFO.to_vec(),
            aad: DEFAULT_AAD.to_vec(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

impl ChannelConfig {
    pub fn with_info(mut self, info: impl Into<Vec<u8>>) -> Self {
        self.info = info.into();
        self
    }

    pub fn with_aad(mut self, aad: impl Into<Vec<u8>>) -> Self {
        self.aad = aad.into();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), HandshakeError> {
        let compiled = SuiteId::compiled();
        if self.suite != compiled {
            return Err(HandshakeError::Config(format!(
                "unsupported suite {}, only {} is compiled in",
                self.suite, compiled
            )));
        }
        if self.max_frame_len == 0 {
            return Err(HandshakeError::Config(
                "max_frame_len must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_arg() {
        assert_eq!(Role::from_arg("server"), Role::Responder);
        assert_eq!(Role::from_arg("client"), Role::Initiator);
        assert_eq!(Role::from_arg(""), Role::Initiator);
        assert_eq!(Role::from_arg("Server"), Role::Initiator);
    }

    #[test]
    fn test_packet_type_from_u8() {
        assert_eq!(PacketType::try_from(0), Ok(PacketType::EncryptedPacket));
        assert_eq!(PacketType::try_from(1), Err(1));
        assert_eq!(PacketType::try_from(255), Err(255));
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = ChannelConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.info.is_empty());
        assert!(config.aad.is_empty());
        assert_eq!(config.port, 4444);
    }

    #[test]
    fn test_foreign_suite_rejected() {
        let mut config = ChannelConfig::default();
        config.suite = SuiteId {
            kem: 0x0020,
            kdf: 0x0001,
            aead: 0x0003,
        };
        assert!(matches!(config.validate(), Err(HandshakeError::Config(_))));
    }

    #[test]
    fn test_zero_frame_len_rejected() {
        let config = ChannelConfig::default().with_max_frame_len(0);
        assert!(matches!(config.validate(), Err(HandshakeError::Config(_))));
    }
}

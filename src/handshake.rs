//! Handshake engine: key exchange and HPKE context setup for both roles.
//!
//! Message order is fixed by role and both peers must follow it exactly,
//! since frames are only paired by position on a blocking stream:
//!
//! | step | Initiator            | Responder            |
//! |------|----------------------|----------------------|
//! | 1    | recv responder key   | send responder key   |
//! | 2    | send initiator key   | recv initiator key   |
//! | 3    | send initiator enc   | recv initiator enc   |
//! | 4    | recv responder enc   | send responder enc   |

use std::io::{Read, Write};

use rand::rngs::OsRng;
use tracing::{debug, info};

use crate::codec::Codec;
use crate::communicator::Communicator;
use crate::crypto::{
    fingerprint, parse_public_key, setup_opener, setup_sealer, short_fingerprint, KeyPair,
    Opener, PublicKey, Sealer,
};
use crate::error::HandshakeError;
use crate::types::{ChannelConfig, Role};

/// Run the handshake for `role` over `stream`
pub fn handshake<S: Read + Write>(
    role: Role,
    stream: S,
    config: &ChannelConfig,
) -> Result<Communicator<S>, HandshakeError> {
    match role {
        Role::Initiator => initiator_handshake(stream, config),
        Role::Responder => responder_handshake(stream, config),
    }
}

/// Initiator handshake: read the responder's key first, send our
/// encapsulation first
pub fn initiator_handshake<S: Read + Write>(
    stream: S,
    config: &ChannelConfig,
) -> Result<Communicator<S>, HandshakeError> {
    let mut hs = Handshake::start(Role::Initiator, stream, config)?;

    let peer = hs.recv_public_key()?;
    hs.send_public_key()?;

    let sealer = hs.send_encapsulation(&peer)?;
    let enc = hs.recv_encapsulation()?;
    let opener = hs.open_encapsulation(&enc)?;

    Ok(hs.finish(sealer, opener))
}

/// Responder handshake: send our key first, read the initiator's
/// encapsulation first
pub fn responder_handshake<S: Read + Write>(
    stream: S,
    config: &ChannelConfig,
) -> Result<Communicator<S>, HandshakeError> {
    let mut hs = Handshake::start(Role::Responder, stream, config)?;

    hs.send_public_key()?;
    let peer = hs.recv_public_key()?;

    let enc = hs.recv_encapsulation()?;
    let sealer = hs.send_encapsulation(&peer)?;
    let opener = hs.open_encapsulation(&enc)?;

    Ok(hs.finish(sealer, opener))
}

/// In-progress handshake state for one side
struct Handshake<'a, S> {
    role: Role,
    codec: Codec<S>,
    keypair: KeyPair,
    config: &'a ChannelConfig,
}

impl<'a, S: Read + Write> Handshake<'a, S> {
    fn start(role: Role, stream: S, config: &'a ChannelConfig) -> Result<Self, HandshakeError> {
        config.validate()?;

        let keypair = KeyPair::generate(&mut OsRng);
        debug!(
            ?role,
            fingerprint = %short_fingerprint(&keypair.fingerprint()),
            "generated ephemeral key pair"
        );

        Ok(Self {
            role,
            codec: Codec::with_max_frame_len(stream, config.max_frame_len),
            keypair,
            config,
        })
    }

    fn send_public_key(&mut self) -> Result<(), HandshakeError> {
        self.codec.send_blob(&self.keypair.public_key_bytes())?;
        debug!(role = ?self.role, "sent public key");
        Ok(())
    }

    fn recv_public_key(&mut self) -> Result<PublicKey, HandshakeError> {
        let bytes = self.codec.recv_blob()?;
        let peer = parse_public_key(&bytes)?;
        debug!(
            role = ?self.role,
            peer = %short_fingerprint(&fingerprint(&bytes)),
            "received peer public key"
        );
        Ok(peer)
    }

    /// Sender setup toward `peer` and transmit the encapsulation
    fn send_encapsulation(&mut self, peer: &PublicKey) -> Result<Sealer, HandshakeError> {
        let (enc, sealer) = setup_sealer(peer, &self.config.info, &mut OsRng)?;
        self.codec.send_blob(&enc)?;
        debug!(role = ?self.role, len = enc.len(), "sent encapsulation");
        Ok(sealer)
    }

    fn recv_encapsulation(&mut self) -> Result<Vec<u8>, HandshakeError> {
        let enc = self.codec.recv_blob()?;
        debug!(role = ?self.role, len = enc.len(), "received peer encapsulation");
        Ok(enc)
    }

    fn open_encapsulation(&self, enc: &[u8]) -> Result<Opener, HandshakeError> {
        setup_opener(self.keypair.private_key(), enc, &self.config.info)
    }

    fn finish(self, sealer: Sealer, opener: Opener) -> Communicator<S> {
        info!(role = ?self.role, "handshake complete");
        Communicator::new(
            self.role,
            self.codec,
            sealer,
            opener,
            self.config.aad.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communicator::ChannelState;
    use crate::error::{ChatError, CryptoError};
    use crate::types::AEAD_TAG_LEN;
    use std::net::{TcpListener, TcpStream};
    use std::thread;
    use std::time::Duration;

    fn tcp_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    fn established(
        config: &ChannelConfig,
    ) -> (Communicator<TcpStream>, Communicator<TcpStream>) {
        let (client, server) = tcp_pair();
        let server_config = config.clone();
        let responder = thread::spawn(move || responder_handshake(server, &server_config));
        let initiator = initiator_handshake(client, config).unwrap();
        let responder = responder.join().unwrap().unwrap();
        (initiator, responder)
    }

    #[test]
    fn test_handshake_roundtrip() {
        let (alice, bob) = established(&ChannelConfig::default());
        assert_eq!(alice.role(), Role::Initiator);
        assert_eq!(bob.role(), Role::Responder);
        assert_eq!(alice.state(), ChannelState::Ready);

        let ct = alice.seal(b"hello").unwrap();
        assert_eq!(bob.open(&ct).unwrap(), b"hello");

        let ct = bob.seal(b"world").unwrap();
        assert_eq!(alice.open(&ct).unwrap(), b"world");
    }

    #[test]
    fn test_seal_open_arbitrary_payloads() {
        let payloads: [&[u8]; 4] = [b"", b"hello", &[0, 0xff, 0x10, 0x80, 0], &[0x42; 4096]];
        for pt in payloads {
            let (alice, bob) = established(&ChannelConfig::default());
            let ct = alice.seal(pt).unwrap();
            assert_eq!(bob.open(&ct).unwrap(), pt);
        }
    }

    #[test]
    fn test_bit_flip_detected() {
        let pt = b"integrity matters";
        let ct_len = pt.len() + AEAD_TAG_LEN;

        // A failed open closes the channel, so each flip gets its own handshake
        for (byte, bit) in [(0, 0), (ct_len / 2, 3), (pt.len(), 7), (ct_len - 1, 7)] {
            let (alice, bob) = established(&ChannelConfig::default());
            let mut ct = alice.seal(pt).unwrap();
            ct[byte] ^= 1 << bit;
            assert!(matches!(
                bob.open(&ct),
                Err(ChatError::Crypto(CryptoError::OpenFailure(_)))
            ));
            assert_eq!(bob.state(), ChannelState::Closed);
        }
    }

    #[test]
    fn test_aad_bit_flip_detected() {
        let (client, server) = tcp_pair();
        let responder = thread::spawn(move || {
            responder_handshake(server, &ChannelConfig::default().with_aad(vec![0x00, 0x03]))
        });
        let alice =
            initiator_handshake(client, &ChannelConfig::default().with_aad(vec![0x00, 0x01]))
                .unwrap();
        let bob = responder.join().unwrap().unwrap();

        let ct = alice.seal(b"bound").unwrap();
        assert!(matches!(
            bob.open(&ct),
            Err(ChatError::Crypto(CryptoError::OpenFailure(_)))
        ));
    }

    #[test]
    fn test_unrelated_handshake_rejected() {
        let (alice, _bob) = established(&ChannelConfig::default());
        let (_carol, dave) = established(&ChannelConfig::default());

        let ct = alice.seal(b"not for dave").unwrap();
        assert!(matches!(
            dave.open(&ct),
            Err(ChatError::Crypto(CryptoError::OpenFailure(_)))
        ));
    }

    #[test]
    fn test_info_mismatch_rejected() {
        let (client, server) = tcp_pair();
        let responder = thread::spawn(move || {
            responder_handshake(server, &ChannelConfig::default().with_info("other"))
        });
        let alice = initiator_handshake(client, &ChannelConfig::default()).unwrap();
        let bob = responder.join().unwrap().unwrap();

        let ct = alice.seal(b"label bound").unwrap();
        assert!(bob.open(&ct).is_err());
    }

    #[test]
    fn test_both_reading_first_stalls() {
        let (client, server) = tcp_pair();
        for s in [&client, &server] {
            s.set_read_timeout(Some(Duration::from_millis(300))).unwrap();
        }

        let other = thread::spawn(move || initiator_handshake(server, &ChannelConfig::default()));
        let mine = initiator_handshake(client, &ChannelConfig::default());
        let theirs = other.join().unwrap();

        assert!(matches!(mine, Err(HandshakeError::Transport(_))));
        assert!(matches!(theirs, Err(HandshakeError::Transport(_))));
    }

    #[test]
    fn test_corrupted_public_key_rejected() {
        let (client, server) = tcp_pair();
        let fake = thread::spawn(move || {
            let mut codec = Codec::new(server);
            codec.send_blob(&[0xff; 97]).unwrap();
        });

        let result = initiator_handshake(client, &ChannelConfig::default());
        fake.join().unwrap();
        assert!(matches!(result, Err(HandshakeError::InvalidKey(_))));
    }

    #[test]
    fn test_garbage_encapsulation_rejected() {
        let (client, server) = tcp_pair();
        let fake = thread::spawn(move || {
            let mut codec = Codec::new(server);
            let kp = KeyPair::generate(&mut OsRng);
            codec.send_blob(&kp.public_key_bytes()).unwrap();
            let _peer_key = codec.recv_blob().unwrap();
            let _peer_enc = codec.recv_blob().unwrap();
            codec.send_blob(b"definitely not a P-384 point").unwrap();
        });

        let result = initiator_handshake(client, &ChannelConfig::default());
        fake.join().unwrap();
        assert!(matches!(result, Err(HandshakeError::Crypto(_))));
    }

    #[test]
    fn test_peer_hangup_is_transport_error() {
        let (client, server) = tcp_pair();
        drop(server);

        let result = initiator_handshake(client, &ChannelConfig::default());
        assert!(matches!(result, Err(HandshakeError::Transport(_))));
    }

    #[test]
    fn test_oversized_key_frame_rejected() {
        let (client, server) = tcp_pair();
        let fake = thread::spawn(move || {
            let mut codec = Codec::new(server);
            codec.send_blob(&[0x04; 200]).unwrap();
        });

        let config = ChannelConfig::default().with_max_frame_len(128);
        let result = initiator_handshake(client, &config);
        fake.join().unwrap();
        assert!(matches!(result, Err(HandshakeError::Decode(_))));
    }

    #[test]
    fn test_foreign_suite_fails_before_io() {
        let (client, _server) = tcp_pair();
        let mut config = ChannelConfig::default();
        config.suite.aead = 0x0003;

        let result = initiator_handshake(client, &config);
        assert!(matches!(result, Err(HandshakeError::Config(_))));
    }

    #[test]
    fn test_security_event_classification() {
        let (alice, bob) = established(&ChannelConfig::default());
        let mut ct = alice.seal(b"x").unwrap();
        ct[0] ^= 0x01;
        assert!(bob.open(&ct).unwrap_err().is_security_event());
    }
}

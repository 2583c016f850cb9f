//! HPKE suite binding: key pairs and directional AEAD contexts.
//!
//! The suite is fixed at compile time to DHKEM(P-384, HKDF-SHA384),
//! HKDF-SHA384 and AES-256-GCM in base mode.

use std::fmt;

use hpke::aead::{Aead as AeadTrait, AeadCtxR, AeadCtxS};
use hpke::kdf::Kdf as KdfTrait;
use hpke::{Deserializable, Kem as KemTrait, OpModeR, OpModeS, Serializable};
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

use crate::error::{CryptoError, HandshakeError};

pub type Kem = hpke::kem::DhP384HkdfSha384;
pub type Kdf = hpke::kdf::HkdfSha384;
pub type Aead = hpke::aead::AesGcm256;

pub type PublicKey = <Kem as KemTrait>::PublicKey;
pub type PrivateKey = <Kem as KemTrait>::PrivateKey;
type EncappedKey = <Kem as KemTrait>::EncappedKey;

/// RFC 9180 algorithm identifiers for a suite
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SuiteId {
    pub kem: u16,
    pub kdf: u16,
    pub aead: u16,
}

impl SuiteId {
    /// Identifiers of the suite this crate is built against
    pub const fn compiled() -> Self {
        Self {
            kem: Kem::KEM_ID,
            kdf: Kdf::KDF_ID,
            aead: Aead::AEAD_ID,
        }
    }
}

impl fmt::Display for SuiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "kem=0x{:04x}/kdf=0x{:04x}/aead=0x{:04x}",
            self.kem, self.kdf, self.aead
        )
    }
}

/// Ephemeral KEM key pair; lives only for one handshake
pub struct KeyPair {
    private: PrivateKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a fresh key pair from the given CSPRNG
    pub fn generate<R: CryptoRng + RngCore>(rng: &mut R) -> Self {
        let (private, public) = Kem::gen_keypair(rng);
        Self { private, public }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private
    }

    /// Serialized public key as sent on the wire
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.public.to_bytes().to_vec()
    }

    /// SHA-256 over the serialized public key
    pub fn fingerprint(&self) -> [u8; 32] {
        fingerprint(&self.public_key_bytes())
    }
}

/// SHA-256 fingerprint of a serialized public key
pub fn fingerprint(public_key: &[u8]) -> [u8; 32] {
    Sha256::digest(public_key).into()
}

/// Short hex form of a fingerprint for log lines
pub fn short_fingerprint(fp: &[u8; 32]) -> String {
    fp[..8].iter().map(|b| format!("{:02x}", b)).collect()
}

/// Parse a peer public key blob
pub fn parse_public_key(bytes: &[u8]) -> Result<PublicKey, HandshakeError> {
    PublicKey::from_bytes(bytes).map_err(|e| HandshakeError::InvalidKey(e.to_string()))
}

/// Sender half of the channel
pub struct Sealer {
    ctx: AeadCtxS<Aead, Kdf, Kem>,
}

impl Sealer {
    /// Encrypt and authenticate `pt` under `aad`
    ///
    /// Returns ciphertext of `pt.len() + AEAD_TAG_LEN` bytes.
    pub fn seal(&mut self, pt: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.ctx
            .seal(pt, aad)
            .map_err(|e| CryptoError::SealFailure(e.to_string()))
    }
}

/// Receiver half of the channel
pub struct Opener {
    ctx: AeadCtxR<Aead, Kdf, Kem>,
}

impl Opener {
    /// Decrypt and verify `ct` under `aad`
    ///
    /// A failed open leaves the context where it was.
    pub fn open(&mut self, ct: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.ctx
            .open(ct, aad)
            .map_err(|e| CryptoError::OpenFailure(e.to_string()))
    }
}

/// Sender setup toward `peer`: returns (encapsulation, sealer)
pub fn setup_sealer<R: CryptoRng + RngCore>(
    peer: &PublicKey,
    info: &[u8],
    rng: &mut R,
) -> Result<(Vec<u8>, Sealer), HandshakeError> {
    let (encapped, ctx) =
        hpke::setup_sender::<Aead, Kdf, Kem, _>(&OpModeS::Base, peer, info, rng)
            .map_err(|e| HandshakeError::Crypto(e.to_string()))?;

    Ok((encapped.to_bytes().to_vec(), Sealer { ctx }))
}

/// Receiver setup from the peer's encapsulation
pub fn setup_opener(
    private: &PrivateKey,
    encapsulation: &[u8],
    info: &[u8],
) -> Result<Opener, HandshakeError> {
    let encapped = EncappedKey::from_bytes(encapsulation)
        .map_err(|e| HandshakeError::Crypto(format!("invalid encapsulation: {}", e)))?;

    let ctx = hpke::setup_receiver::<Aead, Kdf, Kem>(&OpModeR::Base, private, &encapped, info)
        .map_err(|e| HandshakeError::Crypto(e.to_string()))?;

    Ok(Opener { ctx })
}

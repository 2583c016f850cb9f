//! Length-prefixed wire codec over a duplex byte stream.
//!
//! Every value is one frame: a big-endian `u32` length followed by the
//! payload. Blob frames carry raw bytes; packet frames carry a JSON
//! `WirePacket` whose body is base64.

use std::io::{Read, Write};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::error::CodecError;
use crate::types::{Packet, PacketType, WirePacket, DEFAULT_MAX_FRAME_LEN};

/// Reads and writes frames on `S` strictly in call order
pub struct Codec<S> {
    stream: S,
    max_frame_len: usize,
}

impl<S: Read + Write> Codec<S> {
    pub fn new(stream: S) -> Self {
        Self::with_max_frame_len(stream, DEFAULT_MAX_FRAME_LEN)
    }

    pub fn with_max_frame_len(stream: S, max_frame_len: usize) -> Self {
        Self {
            stream,
            max_frame_len,
        }
    }

    /// Send one raw byte blob
    pub fn send_blob(&mut self, blob: &[u8]) -> Result<(), CodecError> {
        self.write_frame(blob)
    }

    /// Receive one raw byte blob
    pub fn recv_blob(&mut self) -> Result<Vec<u8>, CodecError> {
        self.read_frame()
    }

    /// Send one packet
    pub fn send_packet(&mut self, packet: &Packet) -> Result<(), CodecError> {
        let wire = WirePacket {
            packet_type: packet.packet_type as u8,
            body: BASE64.encode(&packet.body),
        };
        let bytes = serde_json::to_vec(&wire).map_err(|e| CodecError::Decode(e.to_string()))?;
        self.write_frame(&bytes)
    }

    /// Receive one packet, rejecting unknown packet types
    pub fn recv_packet(&mut self) -> Result<Packet, CodecError> {
        let bytes = self.read_frame()?;
        let wire: WirePacket =
            serde_json::from_slice(&bytes).map_err(|e| CodecError::Decode(e.to_string()))?;

        let packet_type =
            PacketType::try_from(wire.packet_type).map_err(CodecError::UnknownPacketType)?;
        let body = BASE64
            .decode(&wire.body)
            .map_err(|e| CodecError::Decode(format!("invalid body encoding: {}", e)))?;

        Ok(Packet { packet_type, body })
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Give back the underlying stream
    pub fn into_inner(self) -> S {
        self.stream
    }

    fn write_frame(&mut self, payload: &[u8]) -> Result<(), CodecError> {
        if payload.len() > self.max_frame_len {
            return Err(CodecError::FrameTooLarge {
                len: payload.len(),
                max: self.max_frame_len,
            });
        }
        let len = u32::try_from(payload.len()).map_err(|_| CodecError::FrameTooLarge {
            len: payload.len(),
            max: u32::MAX as usize,
        })?;

        self.stream.write_all(&len.to_be_bytes())?;
        self.stream.write_all(payload)?;
        self.stream.flush()?;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Vec<u8>, CodecError> {
        let mut len_buf = [0u8; 4];
        self.stream.read_exact(&mut len_buf)?;
        let len = u32::from_be_bytes(len_buf) as usize;

        // Bound the allocation before trusting the peer's length
        if len > self.max_frame_len {
            return Err(CodecError::FrameTooLarge {
                len,
                max: self.max_frame_len,
            });
        }

        let mut payload = vec![0u8; len];
        self.stream.read_exact(&mut payload)?;
        Ok(payload)
    }
}

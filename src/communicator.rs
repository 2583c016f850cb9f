//! Post-handshake channel: one sealed message in each direction.

use std::io::{self, Read, Write};

use parking_lot::Mutex;
use tracing::{debug, warn};
use zeroize::Zeroize;

use crate::codec::Codec;
use crate::crypto::{Opener, Sealer};
use crate::error::{ChatError, Result};
use crate::types::{Packet, Role};

/// Lifecycle of an established channel.
///
/// The earlier phases are the handshake functions themselves: a
/// `Communicator` only exists once a handshake succeeds, so it starts in
/// `Ready` and can never return to handshaking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelState {
    Ready,
    /// Initiator has sent its message
    Sent,
    /// Responder has received the initiator's message
    Received,
    Closed,
}

/// Established channel produced by a successful handshake
pub struct Communicator<S> {
    role: Role,
    inner: Mutex<CommunicatorInner<S>>,
}

struct CommunicatorInner<S> {
    codec: Codec<S>,
    sealer: Sealer,
    opener: Opener,
    aad: Vec<u8>,
    state: ChannelState,
}

impl<S: Read + Write> Communicator<S> {
    pub(crate) fn new(
        role: Role,
        codec: Codec<S>,
        sealer: Sealer,
        opener: Opener,
        aad: Vec<u8>,
    ) -> Self {
        Self {
            role,
            inner: Mutex::new(CommunicatorInner {
                codec,
                sealer,
                opener,
                aad,
                state: ChannelState::Ready,
            }),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> ChannelState {
        self.inner.lock().state
    }

    /// Seal `pt` as the role's single outgoing message.
    ///
    /// Counts as the send: the caller carries the ciphertext to the peer, and
    /// a later `send_message` is rejected.
    pub fn seal(&self, pt: &[u8]) -> Result<Vec<u8>> {
        let mut inner = self.inner.lock();
        let next = self.next_state(inner.state, Direction::Send)?;

        let result = Self::seal_inner(&mut inner, pt);
        inner.state = Self::settle(next, &result);
        result
    }

    /// Open `ct` as the role's single incoming message.
    ///
    /// Counts as the receive; a failed open closes the channel.
    pub fn open(&self, ct: &[u8]) -> Result<Vec<u8>> {
        let mut inner = self.inner.lock();
        let next = self.next_state(inner.state, Direction::Receive)?;

        let result = Self::open_inner(&mut inner, ct);
        inner.state = Self::settle(next, &result);
        result
    }

    /// Seal `pt` and send it as the role's single outgoing packet
    pub fn send_message(&self, pt: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock();
        let next = self.next_state(inner.state, Direction::Send)?;

        let result = Self::seal_inner(&mut inner, pt).and_then(|ct| {
            inner.codec.send_packet(&Packet::encrypted(ct))?;
            Ok(())
        });
        inner.state = Self::settle(next, &result);
        debug!(role = ?self.role, state = ?inner.state, "message sent");
        result
    }

    /// Receive the role's single incoming packet and open it
    pub fn receive_message(&self) -> Result<Vec<u8>> {
        let mut inner = self.inner.lock();
        let next = self.next_state(inner.state, Direction::Receive)?;

        let result = inner
            .codec
            .recv_packet()
            .map_err(ChatError::from)
            .and_then(|packet| Self::open_inner(&mut inner, &packet.body));
        inner.state = Self::settle(next, &result);
        debug!(role = ?self.role, state = ?inner.state, "message received");
        result
    }

    /// Run the role's single-round exchange.
    ///
    /// `prompt` supplies the outgoing plaintext and `deliver` consumes the
    /// incoming one. The initiator prompts before receiving; the responder
    /// delivers before prompting.
    pub fn chat<P, D>(&self, prompt: P, deliver: D) -> Result<()>
    where
        P: FnOnce() -> io::Result<Vec<u8>>,
        D: FnOnce(&[u8]),
    {
        match self.role {
            Role::Initiator => {
                self.prompt_and_send(prompt)?;
                self.receive_and_deliver(deliver)
            }
            Role::Responder => {
                self.receive_and_deliver(deliver)?;
                self.prompt_and_send(prompt)
            }
        }
    }

    /// Tear down the channel and hand back the transport
    pub fn into_inner(self) -> S {
        self.inner.into_inner().codec.into_inner()
    }

    fn prompt_and_send<P>(&self, prompt: P) -> Result<()>
    where
        P: FnOnce() -> io::Result<Vec<u8>>,
    {
        let mut pt = match prompt() {
            Ok(pt) => pt,
            Err(e) => {
                self.inner.lock().state = ChannelState::Closed;
                return Err(ChatError::Input(e));
            }
        };
        let result = self.send_message(&pt);
        pt.zeroize();
        result
    }

    fn receive_and_deliver<D>(&self, deliver: D) -> Result<()>
    where
        D: FnOnce(&[u8]),
    {
        let mut pt = self.receive_message()?;
        deliver(&pt);
        pt.zeroize();
        Ok(())
    }

    /// State after `direction`, or `InvalidState` if the role's order
    /// does not allow it now
    fn next_state(&self, state: ChannelState, direction: Direction) -> Result<ChannelState> {
        match (self.role, direction, state) {
            (Role::Initiator, Direction::Send, ChannelState::Ready) => Ok(ChannelState::Sent),
            (Role::Initiator, Direction::Receive, ChannelState::Sent) => Ok(ChannelState::Closed),
            (Role::Responder, Direction::Receive, ChannelState::Ready) => {
                Ok(ChannelState::Received)
            }
            (Role::Responder, Direction::Send, ChannelState::Received) => {
                Ok(ChannelState::Closed)
            }
            (_, direction, state) => Err(ChatError::InvalidState {
                state,
                operation: direction.as_str(),
            }),
        }
    }

    /// Any failure mid-exchange is terminal
    fn settle<T>(next: ChannelState, result: &Result<T>) -> ChannelState {
        if result.is_ok() {
            next
        } else {
            ChannelState::Closed
        }
    }

    fn seal_inner(inner: &mut CommunicatorInner<S>, pt: &[u8]) -> Result<Vec<u8>> {
        Ok(inner.sealer.seal(pt, &inner.aad)?)
    }

    fn open_inner(inner: &mut CommunicatorInner<S>, ct: &[u8]) -> Result<Vec<u8>> {
        inner.opener.open(ct, &inner.aad).map_err(|e| {
            warn!("ciphertext failed authentication");
            ChatError::from(e)
        })
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Send,
    Receive,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::Send => "send",
            Direction::Receive => "receive",
        }
    }
}

//! Network collaborator contract (spec section 6): what the core
//! consumes from the peer-to-peer layer. Wire framing of the messages
//! themselves is out of scope; this only names the shape the controller
//! needs.

use std::collections::HashMap;
use std::net::SocketAddr;

use crate::types::{Block, BlockId};

/// Opaque data the network layer keeps per peer; the core only needs to
/// know a peer exists and where to address it.
#[derive(Clone, Debug)]
pub struct PeerData {
    pub address: SocketAddr,
    pub announced_score: Option<u128>,
}

/// A message the controller can ask the network layer to send. Wire
/// encoding of the payload is out of scope (spec section 6); this is the
/// shape the core produces and expects to consume.
#[derive(Clone, Debug)]
pub enum NetworkMessage {
    BlockMessage { height: u32, block: Block },
    GetSignatures { last_signatures: Vec<BlockId> },
    GetMaxChainScore,
}

pub trait NetworkHandle: Send + Sync {
    fn send(&self, peer: SocketAddr, message: NetworkMessage);
    fn broadcast(&self, message: NetworkMessage);
    fn best_peer(&self) -> Option<SocketAddr>;
    fn peers(&self) -> HashMap<SocketAddr, PeerData>;
}

/// A network handle with no peers, for single-node demos and tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPeersNetwork;

impl NetworkHandle for NoPeersNetwork {
    fn send(&self, _peer: SocketAddr, _message: NetworkMessage) {}
    fn broadcast(&self, _message: NetworkMessage) {}
    fn best_peer(&self) -> Option<SocketAddr> {
        None
    }
    fn peers(&self) -> HashMap<SocketAddr, PeerData> {
        HashMap::new()
    }
}

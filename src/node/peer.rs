//! Peer handles used for Sync fan-out and bid forwarding

use crate::common::{peer_uri, Error, Result};
use crate::node::state::{BidOutcome, SyncUpdate};
use crate::proto::auction_client::AuctionClient;
use crate::proto::{BidRequest, SyncRequest};
use std::time::Duration;
use tonic::metadata::{Ascii, MetadataValue};
use tonic::transport::{Channel, Endpoint};

/// Metadata key marking a bid that a follower forwarded on a client's behalf
pub const FORWARDED_BY_HEADER: &str = "x-forwarded-by";

/// Dial a node eagerly, for one-shot clients such as the CLI.
///
/// A node that is down surfaces as a retryable [`Error::Transport`].
pub async fn connect_client(target: &str, timeout: Duration) -> Result<AuctionClient<Channel>> {
    let channel = Endpoint::from_shared(peer_uri(target))
        .map_err(|e| Error::InvalidConfig(format!("invalid target {}: {}", target, e)))?
        .connect_timeout(timeout)
        .timeout(timeout)
        .connect()
        .await?;
    Ok(AuctionClient::new(channel))
}

/// Another node of the auction, as seen from this one.
#[tonic::async_trait]
pub trait AuctionPeer: Send + Sync {
    fn addr(&self) -> &str;

    /// Push the winning pair; returns the peer's ack
    async fn sync(&self, update: &SyncUpdate) -> Result<bool>;

    /// Relay a client bid, tagged with the forwarding node's id
    async fn forward_bid(&self, bidder_id: &str, amount: i32, origin: &str) -> Result<BidOutcome>;
}

/// gRPC peer over a channel opened once and shared by every call.
///
/// The channel is lazy: nothing is dialled until the first call, and a peer
/// that is down only costs the calls made to it.
pub struct GrpcPeer {
    addr: String,
    client: AuctionClient<Channel>,
}

impl GrpcPeer {
    /// Must be called inside a tokio runtime.
    pub fn connect_lazy(addr: &str, timeout: Duration) -> Result<Self> {
        let endpoint = Endpoint::from_shared(peer_uri(addr))
            .map_err(|e| Error::InvalidConfig(format!("invalid peer address {}: {}", addr, e)))?
            .connect_timeout(timeout)
            .timeout(timeout);

        Ok(Self {
            addr: addr.to_string(),
            client: AuctionClient::new(endpoint.connect_lazy()),
        })
    }
}

#[tonic::async_trait]
impl AuctionPeer for GrpcPeer {
    fn addr(&self) -> &str {
        &self.addr
    }

    async fn sync(&self, update: &SyncUpdate) -> Result<bool> {
        let mut client = self.client.clone();
        let request = tonic::Request::new(SyncRequest {
            highest_bid: update.highest_bid,
            winner_id: update.winner_id.clone(),
        });

        let response = client.sync(request).await?;
        Ok(response.into_inner().ack)
    }

    async fn forward_bid(&self, bidder_id: &str, amount: i32, origin: &str) -> Result<BidOutcome> {
        let origin: MetadataValue<Ascii> = origin
            .parse()
            .map_err(|_| Error::Internal(format!("node id {:?} is not valid metadata", origin)))?;

        let mut request = tonic::Request::new(BidRequest {
            bidder_id: bidder_id.to_string(),
            amount,
        });
        request.metadata_mut().insert(FORWARDED_BY_HEADER, origin);

        let mut client = self.client.clone();
        let response = client.bid(request).await?;
        Ok(response.into_inner().into())
    }
}

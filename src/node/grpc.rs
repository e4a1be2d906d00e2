//! Auction gRPC service
//!
//! Thin adapter from the generated `Auction` trait to [`AuctionService`].
//! Business rejections come back as `BidResponse { status: FAIL }`; only a
//! forwarded bid reaching a non-leader is turned into a gRPC error.

use crate::node::peer::FORWARDED_BY_HEADER;
use crate::node::service::AuctionService;
use crate::node::state::{AuctionState, BidOutcome, BidStatus};
use crate::proto::auction_server::{Auction, AuctionServer};
use crate::proto::*;
use std::sync::Arc;
use tonic::{Request, Response, Status};

/// AuctionGrpcService implements the Bid/Result/Sync gRPC API.
pub struct AuctionGrpcService {
    service: Arc<AuctionService>,
}

impl AuctionGrpcService {
    pub fn new(service: Arc<AuctionService>) -> Self {
        Self { service }
    }

    /// Converts this service into a gRPC server instance.
    pub fn into_server(self) -> AuctionServer<Self> {
        AuctionServer::new(self)
    }
}

#[tonic::async_trait]
impl Auction for AuctionGrpcService {
    async fn bid(&self, req: Request<BidRequest>) -> Result<Response<BidResponse>, Status> {
        let forwarded_by = req
            .metadata()
            .get(FORWARDED_BY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bid = req.into_inner();

        let outcome = match forwarded_by {
            Some(origin) => self
                .service
                .bid_forwarded(&bid.bidder_id, bid.amount, &origin)
                .await
                .map_err(|e| e.to_grpc_status())?,
            None => self.service.bid(&bid.bidder_id, bid.amount).await,
        };
        Ok(Response::new(outcome.into()))
    }

    async fn result(&self, _req: Request<ResultRequest>) -> Result<Response<ResultResponse>, Status> {
        Ok(Response::new(self.service.result().into()))
    }

    async fn sync(&self, req: Request<SyncRequest>) -> Result<Response<SyncResponse>, Status> {
        let sync = req.into_inner();
        let ack = self.service.sync(sync.highest_bid, &sync.winner_id);
        Ok(Response::new(SyncResponse { ack }))
    }
}

impl From<BidOutcome> for BidResponse {
    fn from(outcome: BidOutcome) -> Self {
        let status = match outcome.status {
            BidStatus::Success => bid_response::Status::Success,
            BidStatus::Fail => bid_response::Status::Fail,
        };
        BidResponse {
            status: status as i32,
            reason: outcome.reason,
        }
    }
}

impl From<BidResponse> for BidOutcome {
    fn from(resp: BidResponse) -> Self {
        let status = match resp.status() {
            bid_response::Status::Success => BidStatus::Success,
            bid_response::Status::Fail => BidStatus::Fail,
        };
        BidOutcome {
            status,
            reason: resp.reason,
        }
    }
}

impl From<AuctionState> for ResultResponse {
    fn from(state: AuctionState) -> Self {
        ResultResponse {
            highest_bid: state.highest_bid,
            winner_id: state.winner_id,
            is_over: state.is_over,
        }
    }
}

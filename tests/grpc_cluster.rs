//! Real gRPC nodes on loopback ports

use miniauction::common::{FailoverPolicy, NodeConfig, NodeRole};
use miniauction::node::{connect_client, serve_grpc, AuctionNode, AuctionService, FORWARDED_BY_HEADER};
use miniauction::Error;
use miniauction::proto::auction_client::AuctionClient;
use miniauction::proto::{bid_response, BidRequest, ResultRequest, SyncRequest};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tonic::transport::Channel;

struct TestNode {
    addr: SocketAddr,
    service: Arc<AuctionService>,
    _shutdown: oneshot::Sender<()>,
}

impl TestNode {
    async fn client(&self) -> AuctionClient<Channel> {
        AuctionClient::connect(format!("http://{}", self.addr))
            .await
            .unwrap()
    }
}

async fn bind() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

async fn start(
    listener: TcpListener,
    id: &str,
    role: NodeRole,
    failover: FailoverPolicy,
    peers: Vec<String>,
) -> TestNode {
    let addr = listener.local_addr().unwrap();
    let config = NodeConfig {
        node_id: id.to_string(),
        role,
        grpc_addr: addr,
        peers,
        peer_timeout_ms: 500,
        failover,
        ..Default::default()
    };
    let service = AuctionNode::new(config).build_service().unwrap();

    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(serve_grpc(service.clone(), listener, async {
        let _ = rx.await;
    }));

    TestNode {
        addr,
        service,
        _shutdown: tx,
    }
}

/// Loopback port where nothing listens
const DEAD_PEER: &str = "127.0.0.1:1";

async fn wait_for_result(
    client: &mut AuctionClient<Channel>,
    highest_bid: i32,
) -> miniauction::proto::ResultResponse {
    for _ in 0..100 {
        let res = client.result(ResultRequest {}).await.unwrap().into_inner();
        if res.highest_bid == highest_bid {
            return res;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("node never reached highest bid {}", highest_bid);
}

fn bid(bidder_id: &str, amount: i32) -> BidRequest {
    BidRequest {
        bidder_id: bidder_id.to_string(),
        amount,
    }
}

#[tokio::test]
async fn test_leader_replicates_over_grpc() {
    let (b_listener, b_addr) = bind().await;
    let b = start(b_listener, "b", NodeRole::Follower, FailoverPolicy::Strict, vec![]).await;

    let (a_listener, _) = bind().await;
    let a = start(
        a_listener,
        "a",
        NodeRole::Leader,
        FailoverPolicy::Strict,
        vec![b_addr.to_string()],
    )
    .await;

    let mut a_client = a.client().await;
    let res = a_client.bid(bid("alice", 200)).await.unwrap().into_inner();
    assert_eq!(res.status(), bid_response::Status::Success);

    let mut b_client = b.client().await;
    let result = wait_for_result(&mut b_client, 200).await;
    assert_eq!(result.winner_id, "alice");
    assert!(!result.is_over);
}

#[tokio::test]
async fn test_rejections_are_responses_not_errors() {
    let (listener, _) = bind().await;
    let leader = start(listener, "a", NodeRole::Leader, FailoverPolicy::Strict, vec![]).await;
    let (listener, _) = bind().await;
    let follower = start(listener, "b", NodeRole::Follower, FailoverPolicy::Strict, vec![]).await;

    let mut client = leader.client().await;
    client.bid(bid("alice", 100)).await.unwrap();
    let low = client.bid(bid("bob", 50)).await.unwrap().into_inner();
    assert_eq!(low.status(), bid_response::Status::Fail);
    assert_eq!(low.reason, "Bid too low. Current: 100");

    let mut client = follower.client().await;
    let res = client.bid(bid("carol", 500)).await.unwrap().into_inner();
    assert_eq!(res.status(), bid_response::Status::Fail);
    assert!(res.reason.contains("not the leader"));
    assert_eq!(follower.service.result().highest_bid, 0);
}

#[tokio::test]
async fn test_leader_survives_dead_peer() {
    let (b_listener, b_addr) = bind().await;
    let b = start(b_listener, "b", NodeRole::Follower, FailoverPolicy::Strict, vec![]).await;

    let (a_listener, _) = bind().await;
    let a = start(
        a_listener,
        "a",
        NodeRole::Leader,
        FailoverPolicy::Strict,
        vec![DEAD_PEER.to_string(), b_addr.to_string()],
    )
    .await;

    let mut client = a.client().await;
    let res = client.bid(bid("alice", 42)).await.unwrap().into_inner();
    assert_eq!(res.status(), bid_response::Status::Success);

    let mut b_client = b.client().await;
    wait_for_result(&mut b_client, 42).await;

    // The dead peer's failure is counted once the fan-out completes
    for _ in 0..100 {
        if a.service.metrics().replication_failed.get() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(a.service.metrics().replication_failed.get(), 1);
}

#[tokio::test]
async fn test_sync_rpc_always_acks() {
    let (listener, _) = bind().await;
    let node = start(listener, "b", NodeRole::Follower, FailoverPolicy::Strict, vec![]).await;
    let mut client = node.client().await;

    for (highest_bid, winner_id) in [(300, "alice"), (100, "bob"), (300, "carol")] {
        let res = client
            .sync(SyncRequest {
                highest_bid,
                winner_id: winner_id.to_string(),
            })
            .await
            .unwrap()
            .into_inner();
        assert!(res.ack);
    }

    let result = client.result(ResultRequest {}).await.unwrap().into_inner();
    assert_eq!(result.highest_bid, 300);
    assert_eq!(result.winner_id, "alice");
}

#[tokio::test]
async fn test_promote_follower_forwards_over_grpc() {
    let (l_listener, l_addr) = bind().await;
    let leader = start(l_listener, "a", NodeRole::Leader, FailoverPolicy::Strict, vec![]).await;

    let (f_listener, _) = bind().await;
    let follower = start(
        f_listener,
        "b",
        NodeRole::Follower,
        FailoverPolicy::Promote,
        vec![l_addr.to_string()],
    )
    .await;

    let mut client = follower.client().await;
    let res = client.bid(bid("alice", 75)).await.unwrap().into_inner();
    assert_eq!(res.status(), bid_response::Status::Success);

    assert_eq!(leader.service.result().highest_bid, 75);
    assert_eq!(follower.service.role(), NodeRole::Follower);
}

#[tokio::test]
async fn test_promote_follower_self_promotes() {
    // A second promote-policy follower refuses forwarded bids
    let (o_listener, o_addr) = bind().await;
    let other = start(o_listener, "c", NodeRole::Follower, FailoverPolicy::Promote, vec![]).await;

    let (f_listener, _) = bind().await;
    let follower = start(
        f_listener,
        "b",
        NodeRole::Follower,
        FailoverPolicy::Promote,
        vec![DEAD_PEER.to_string(), o_addr.to_string()],
    )
    .await;

    let mut client = follower.client().await;
    let res = client.bid(bid("alice", 30)).await.unwrap().into_inner();
    assert_eq!(res.status(), bid_response::Status::Success);
    assert_eq!(follower.service.role(), NodeRole::Leader);

    // As the new leader it pushes to c, which stays a follower
    let mut other_client = other.client().await;
    wait_for_result(&mut other_client, 30).await;
    assert_eq!(other.service.role(), NodeRole::Follower);
}

#[tokio::test]
async fn test_client_errors_classified_for_retry() {
    // Nothing listens on the dead port: a transient failure
    let err = connect_client(DEAD_PEER, Duration::from_millis(500))
        .await
        .err()
        .expect("connecting to a dead port must fail");
    assert!(matches!(err, Error::Transport(_)));
    assert!(err.is_retryable());

    // A malformed target is not worth retrying
    let err = connect_client("http://bad host:1", Duration::from_millis(500))
        .await
        .err()
        .expect("invalid target must fail");
    assert!(!err.is_retryable());

    // A follower refusing a forwarded bid answers with a permanent status
    let (listener, _) = bind().await;
    let follower = start(listener, "b", NodeRole::Follower, FailoverPolicy::Strict, vec![]).await;
    let mut client = connect_client(&follower.addr.to_string(), Duration::from_secs(1))
        .await
        .unwrap();
    let mut request = tonic::Request::new(bid("alice", 10));
    request
        .metadata_mut()
        .insert(FORWARDED_BY_HEADER, "a".parse().unwrap());
    let err = Error::from(client.bid(request).await.unwrap_err());
    assert!(!err.is_retryable());
    assert_eq!(err.to_grpc_status().code(), tonic::Code::FailedPrecondition);
}

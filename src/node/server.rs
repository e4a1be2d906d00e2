//! Auction node server

use crate::common::{deadline_after, NodeConfig, NodeMetrics, Result};
use crate::node::grpc::AuctionGrpcService;
use crate::node::http::create_router;
use crate::node::peer::{AuctionPeer, GrpcPeer};
use crate::node::replication::ReplicationClient;
use crate::node::role::RoleController;
use crate::node::service::AuctionService;
use crate::node::state::StateMachine;
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;

pub struct AuctionNode {
    config: NodeConfig,
}

impl AuctionNode {
    pub fn new(config: NodeConfig) -> Self {
        Self { config }
    }

    /// Wire up peers, state, role and replication for this node.
    ///
    /// The auction deadline starts counting here. Must run inside a tokio
    /// runtime (peer channels are created lazily on it).
    pub fn build_service(&self) -> Result<Arc<AuctionService>> {
        self.config.validate()?;

        let metrics = Arc::new(NodeMetrics::new());
        let peers = self
            .config
            .peers
            .iter()
            .map(|addr| {
                GrpcPeer::connect_lazy(addr, self.config.peer_timeout())
                    .map(|peer| Arc::new(peer) as Arc<dyn AuctionPeer>)
            })
            .collect::<Result<Vec<_>>>()?;

        let end_time = deadline_after(self.config.auction_duration())?;
        let replication = ReplicationClient::new(
            self.config.node_id.clone(),
            peers,
            self.config.peer_timeout(),
            metrics.clone(),
        );
        let role = RoleController::new(
            self.config.node_id.clone(),
            self.config.role,
            self.config.failover,
        );

        Ok(Arc::new(AuctionService::new(
            self.config.node_id.clone(),
            StateMachine::new(end_time),
            role,
            replication,
            metrics,
        )))
    }

    pub async fn serve(self) -> Result<()> {
        tracing::info!("Starting auction node: {}", self.config.node_id);
        tracing::info!("  gRPC API: {}", self.config.grpc_addr);
        if let Some(admin_addr) = self.config.admin_addr {
            tracing::info!("  Admin API: {}", admin_addr);
        }
        tracing::info!("  Role: {} (failover: {})", self.config.role, self.config.failover);
        tracing::info!("  Peers: {:?}", self.config.peers);

        let service = self.build_service()?;
        tracing::info!("  Auction closes at {}", service.result().end_time.to_rfc3339());

        let grpc_listener = TcpListener::bind(self.config.grpc_addr).await?;
        let grpc_server = serve_grpc(service.clone(), grpc_listener, shutdown_signal());

        tracing::info!("✓ Auction node ready ({})", service.role());

        match self.config.admin_addr {
            Some(admin_addr) => {
                let http_listener = TcpListener::bind(admin_addr).await?;
                let http_server = axum::serve(http_listener, create_router(service))
                    .with_graceful_shutdown(shutdown_signal())
                    .into_future();

                tokio::select! {
                    res = grpc_server => {
                        if let Err(e) = res {
                            tracing::error!("gRPC server error: {}", e);
                        }
                    }
                    res = http_server => {
                        if let Err(e) = res {
                            tracing::error!("HTTP server error: {}", e);
                        }
                    }
                }
            }
            None => grpc_server.await?,
        }

        tracing::info!("Auction node {} stopped", self.config.node_id);
        Ok(())
    }
}

/// Serve the auction gRPC API on an already-bound listener until `shutdown` resolves.
pub async fn serve_grpc(
    service: Arc<AuctionService>,
    listener: TcpListener,
    shutdown: impl Future<Output = ()> + Send,
) -> Result<()> {
    tonic::transport::Server::builder()
        .add_service(AuctionGrpcService::new(service).into_server())
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

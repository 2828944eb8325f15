use crate::driver::{ReplayProgress, SharedProgress};
use jsonrpsee::{
    core::{async_trait, RpcResult},
    proc_macros::rpc,
    server::{ServerBuilder, ServerHandle},
};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};

// Read-only view of the running replay
#[rpc(server)]
pub trait ReplayStatusRpc {
    #[method(name = "replay_status")]
    async fn replay_status(&self) -> RpcResult<ReplayProgress>;
}

pub struct ReplayStatusRpcImpl {
    progress: SharedProgress,
}

impl ReplayStatusRpcImpl {
    pub fn new(progress: SharedProgress) -> Self {
        Self { progress }
    }
}

#[async_trait]
impl ReplayStatusRpcServer for ReplayStatusRpcImpl {
    async fn replay_status(&self) -> RpcResult<ReplayProgress> {
        Ok(self.progress.read().await.clone())
    }
}

pub struct RpcServer {
    handle: ServerHandle,
    addr: SocketAddr,
}

impl RpcServer {
    pub async fn new(
        bind_addr: SocketAddr,
        progress: SharedProgress,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_headers(Any)
            .allow_methods(Any);

        let server = ServerBuilder::default()
            .set_middleware(tower::ServiceBuilder::new().layer(cors))
            .build(bind_addr)
            .await?;

        let addr = server.local_addr()?;
        let handle = server.start(ReplayStatusRpcImpl::new(progress).into_rpc());
        Ok(Self { handle, addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn stop(self) -> Result<(), Box<dyn std::error::Error>> {
        self.handle
            .stop()
            .map_err(|e| format!("Failed to stop server: {:?}", e))?;
        self.handle.stopped().await;
        Ok(())
    }
}

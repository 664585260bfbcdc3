use async_trait::async_trait;
use tonic::transport::Channel;
use tracing::*;

use velum_state::block::Block;

use crate::conv;
use crate::proto;
use crate::proto::dalc_service_client::DalcServiceClient;
use crate::traits::DataAvailabilityLayerClient;
use crate::types::{AvailabilityResult, RetrieveResult, SubmitResult};

use super::GrpcConfig;

/// DALC backend that proxies every call to a remote gRPC service.
///
/// Transport-level failures surface as `Error` statuses, the same as
/// backend-reported errors; the caller's retry logic treats them alike.
pub struct GrpcDalc {
    client: DalcServiceClient<Channel>,
}

impl GrpcDalc {
    /// Connects to the configured remote service.  Connection refusal here is
    /// a construction failure, not a transient status.
    pub async fn connect(config: GrpcConfig) -> Result<Self, tonic::transport::Error> {
        let endpoint = config.endpoint();
        info!(%endpoint, "connecting to DALC service");
        let client = DalcServiceClient::connect(endpoint).await?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DataAvailabilityLayerClient for GrpcDalc {
    async fn start(&self) -> anyhow::Result<()> {
        // The channel is already established; the remote end owns its own
        // background work.
        Ok(())
    }

    async fn submit_block(&self, block: &Block) -> SubmitResult {
        let req = proto::SubmitBlockRequest {
            block: Some(conv::block_to_wire(block)),
        };
        match self.client.clone().submit_block(req).await {
            Ok(resp) => conv::submit_from_wire(resp.into_inner()),
            Err(status) => SubmitResult::Error(status.to_string()),
        }
    }

    async fn check_block_availability(&self, da_height: u64) -> AvailabilityResult {
        let req = proto::CheckBlockAvailabilityRequest { da_height };
        match self.client.clone().check_block_availability(req).await {
            Ok(resp) => conv::availability_from_wire(resp.into_inner()),
            Err(status) => AvailabilityResult::Error(status.to_string()),
        }
    }

    async fn retrieve_blocks(&self, da_height: u64) -> RetrieveResult {
        let req = proto::RetrieveBlocksRequest { da_height };
        match self.client.clone().retrieve_blocks(req).await {
            Ok(resp) => conv::retrieve_from_wire(resp.into_inner()),
            Err(status) => RetrieveResult::Error(status.to_string()),
        }
    }
}

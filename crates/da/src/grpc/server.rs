use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::*;

use crate::conv;
use crate::proto;
use crate::proto::dalc_service_server::{DalcService, DalcServiceServer};
use crate::traits::DataAvailabilityLayerClient;

/// Exposes an in-process DALC backend as a gRPC service.
///
/// Native statuses stay inside the response messages; a gRPC-level error is
/// only returned for requests that are malformed at the wire level.
pub struct DalcGrpcService {
    dalc: Arc<dyn DataAvailabilityLayerClient>,
}

impl DalcGrpcService {
    pub fn new(dalc: Arc<dyn DataAvailabilityLayerClient>) -> Self {
        Self { dalc }
    }

    /// Wraps the service in the tonic server type, ready to be added to a
    /// router.
    pub fn into_server(self) -> DalcServiceServer<Self> {
        DalcServiceServer::new(self)
    }
}

#[tonic::async_trait]
impl DalcService for DalcGrpcService {
    async fn submit_block(
        &self,
        request: Request<proto::SubmitBlockRequest>,
    ) -> Result<Response<proto::SubmitBlockResponse>, Status> {
        let wire_block = request
            .into_inner()
            .block
            .ok_or_else(|| Status::invalid_argument("missing block"))?;
        let block = conv::block_from_wire(wire_block)
            .map_err(|e| Status::invalid_argument(e.to_string()))?;

        debug!(height = %block.height(), "gRPC submit_block");
        let res = self.dalc.submit_block(&block).await;
        Ok(Response::new(proto::SubmitBlockResponse {
            result: Some(conv::submit_to_wire(res)),
        }))
    }

    async fn check_block_availability(
        &self,
        request: Request<proto::CheckBlockAvailabilityRequest>,
    ) -> Result<Response<proto::CheckBlockAvailabilityResponse>, Status> {
        let da_height = request.into_inner().da_height;
        let res = self.dalc.check_block_availability(da_height).await;
        Ok(Response::new(conv::availability_to_wire(res)))
    }

    async fn retrieve_blocks(
        &self,
        request: Request<proto::RetrieveBlocksRequest>,
    ) -> Result<Response<proto::RetrieveBlocksResponse>, Status> {
        let da_height = request.into_inner().da_height;
        debug!(%da_height, "gRPC retrieve_blocks");
        let res = self.dalc.retrieve_blocks(da_height).await;
        Ok(Response::new(conv::retrieve_to_wire(res)))
    }
}

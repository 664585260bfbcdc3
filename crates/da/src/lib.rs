//! Data availability layer client (DALC) contract and its backends.
//!
//! The block manager only ever talks to [`DataAvailabilityLayerClient`]; the
//! mock backend keeps published blocks in memory, the gRPC backend proxies
//! the same contract to an out-of-process service.  A real DA network adapter
//! would be a third implementation of the same trait.

pub mod conv;
pub mod grpc;
pub mod mock;
pub mod traits;
pub mod types;

/// Generated wire types for the DALC gRPC service.
pub mod proto {
    tonic::include_proto!("dalc");
}

pub use traits::DataAvailabilityLayerClient;
pub use types::{AvailabilityResult, RetrieveResult, SubmitResult};

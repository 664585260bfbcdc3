//! gRPC transport for the DALC contract: a client proxying the trait to a
//! remote service, and a server adapter exposing any in-process backend.

pub mod client;
pub mod server;

pub use client::GrpcDalc;
pub use server::DalcGrpcService;

/// Default port the DALC service listens on.
pub const DEFAULT_PORT: u16 = 7980;

/// Connection parameters for a remote DALC service.
#[derive(Clone, Debug)]
pub struct GrpcConfig {
    pub host: String,
    pub port: u16,
}

impl GrpcConfig {
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl Default for GrpcConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: DEFAULT_PORT,
        }
    }
}

use argh::FromArgs;

use velum_da::grpc::DEFAULT_PORT;
use velum_primitives::namespace::NamespaceId;

/// Mock DA layer exposed as a DALC gRPC service.
#[derive(Clone, Debug, FromArgs)]
pub struct Args {
    /// address to listen on (default 0.0.0.0)
    #[argh(option, short = 'o', default = "\"0.0.0.0\".to_owned()")]
    pub host: String,

    /// port to listen on (default 7980)
    #[argh(option, short = 'p', default = "DEFAULT_PORT")]
    pub port: u16,

    /// hex-encoded 8-byte namespace to serve
    #[argh(option, short = 'n', default = "\"0000000000000000\".to_owned()")]
    pub namespace: String,

    /// interval between simulated DA heights, in milliseconds (default 3000)
    #[argh(option, default = "3000")]
    pub da_block_time_ms: u64,
}

impl Args {
    pub fn namespace_id(&self) -> anyhow::Result<NamespaceId> {
        let bytes = hex::decode(&self.namespace)?;
        Ok(NamespaceId::try_from(bytes.as_slice())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_parsing() {
        let mut args = Args {
            host: "0.0.0.0".to_owned(),
            port: DEFAULT_PORT,
            namespace: "0102030405060708".to_owned(),
            da_block_time_ms: 3000,
        };
        assert_eq!(
            args.namespace_id().unwrap(),
            NamespaceId::from([1, 2, 3, 4, 5, 6, 7, 8])
        );

        args.namespace = "01ab".to_owned();
        assert!(args.namespace_id().is_err());
        args.namespace = "not hex".to_owned();
        assert!(args.namespace_id().is_err());
    }
}

//! Standalone DALC service: the mock DA backend exposed over gRPC, for nodes
//! running with the gRPC DA client.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tracing::*;

use velum_common::logging;
use velum_da::grpc::DalcGrpcService;
use velum_da::mock::{MockDaConfig, MockDalc};
use velum_da::DataAvailabilityLayerClient;
use velum_tasks::TaskManager;

use crate::args::Args;

mod args;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();
    if let Err(e) = main_inner(args) {
        eprintln!("FATAL ERROR: {e}");
        return Err(e);
    }

    Ok(())
}

fn main_inner(args: Args) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("velum-rt")
        .build()
        .expect("init: build rt");

    logging::init(logging::LoggerConfig::with_base_name("velum-dalc-server"));

    let listen_addr = SocketAddr::new(args.host.parse::<IpAddr>()?, args.port);
    let namespace = args.namespace_id()?;

    let task_manager = TaskManager::new(runtime.handle().clone());
    let executor = task_manager.executor();
    task_manager.start_signal_listeners();

    let dalc: Arc<dyn DataAvailabilityLayerClient> = Arc::new(MockDalc::new(
        namespace,
        MockDaConfig {
            block_time: Duration::from_millis(args.da_block_time_ms),
        },
    ));

    {
        let dalc = dalc.clone();
        executor.spawn_critical_async("dalc_grpc_server", async move {
            dalc.start().await?;
            info!(%listen_addr, namespace = ?namespace, "DALC service listening");
            tonic::transport::Server::builder()
                .add_service(DalcGrpcService::new(dalc).into_server())
                .serve(listen_addr)
                .await?;
            Ok(())
        });
    }

    task_manager.monitor(Some(SHUTDOWN_GRACE))?;
    info!("exiting");
    Ok(())
}

//! TCP client for the provisioning daemon

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::protocol::{exchange, DispatchError, Stage};
use crate::traits::DaemonNotifier;
use crate::types::DaemonConfig;

/// Wakes the daemon up over its local TCP socket.
#[derive(Debug, Clone)]
pub struct DaemonClient {
    config: DaemonConfig,
}

impl DaemonClient {
    #[must_use]
    pub fn new(config: DaemonConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }
}

#[async_trait]
impl DaemonNotifier for DaemonClient {
    async fn notify(&self) -> Result<(), DispatchError> {
        let endpoint = self.endpoint();
        let connect_timeout = Duration::from_secs(self.config.connect_timeout_secs);
        let io_timeout = Duration::from_secs(self.config.io_timeout_secs);

        log::debug!("[Daemon] Connecting to {endpoint}");
        let stream = match timeout(connect_timeout, TcpStream::connect(&endpoint)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(DispatchError::Io {
                    stage: Stage::Connect,
                    message: format!("{endpoint}: {e}"),
                })
            }
            Err(_) => {
                return Err(DispatchError::Timeout {
                    stage: Stage::Connect,
                    after: connect_timeout,
                })
            }
        };

        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        exchange(&mut reader, &mut write_half, &self.config.version, io_timeout).await?;
        log::info!("[Daemon] Pending work dispatched to {endpoint}");
        Ok(())
    }
}

use private_receiver::ReceiverConfig;
use private_receiver::transport::gateway::run_receiver_with_listener;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A receiver bound to an ephemeral port, stopped through a oneshot instead
/// of a process signal.
pub struct ReceiverTestServer {
    pub port: u16,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<anyhow::Result<()>>>,
}

impl ReceiverTestServer {
    pub async fn start(data_dir: &Path, configure: impl FnOnce(&mut ReceiverConfig)) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("ephemeral receiver listener should bind");
        let port = listener
            .local_addr()
            .expect("ephemeral receiver listener should expose local address")
            .port();

        let mut config = ReceiverConfig {
            host: "127.0.0.1".into(),
            port,
            data_dir: data_dir.to_path_buf(),
            ..ReceiverConfig::default()
        };
        configure(&mut config);

        let (tx, rx) = oneshot::channel::<()>();
        let shutdown = async move {
            let _ = rx.await;
        };
        let handle = tokio::spawn(run_receiver_with_listener(
            listener,
            Arc::new(config),
            shutdown,
        ));

        wait_until_ready(port).await;

        Self {
            port,
            shutdown: Some(tx),
            handle: Some(handle),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{path}", self.port)
    }

    /// Trigger graceful shutdown and wait for the final flush.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle
                .await
                .expect("receiver task should not panic")
                .expect("receiver should shut down cleanly");
        }
    }
}

impl Drop for ReceiverTestServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn wait_until_ready(port: u16) {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .expect("reqwest client should be built");

    for _ in 0..80 {
        let root = client
            .get(format!("http://127.0.0.1:{port}/"))
            .send()
            .await;
        if matches!(root, Ok(response) if response.status().is_success()) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("receiver on port {port} did not become ready");
}

//! Dual-listener test server.
//!
//! The plaintext and TLS listeners run as two independent accept loops. A
//! bind, certificate, or serve error on either one ends the whole server;
//! the shutdown future drains both gracefully.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;

use refarch_types::config::ServerConfig;

use crate::http::router::{build_http_router, build_https_router};

/// How long in-flight TLS connections may finish after shutdown starts.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub struct TestServer {
    config: ServerConfig,
    plain: TcpListener,
    tls_handle: Handle,
}

impl TestServer {
    /// Bind the plaintext listener. The TLS listener binds in [`run`](Self::run).
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
        let plain = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind plaintext listener on {addr}"))?;
        Ok(Self {
            config,
            plain,
            tls_handle: Handle::new(),
        })
    }

    pub fn http_addr(&self) -> Result<SocketAddr> {
        self.plain
            .local_addr()
            .context("plaintext listener has no local address")
    }

    /// Handle for the TLS listener; `listening()` yields its bound address.
    pub fn tls_handle(&self) -> Handle {
        self.tls_handle.clone()
    }

    /// Serve both listeners until `shutdown` resolves or either one fails.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let TestServer {
            config,
            plain,
            tls_handle,
        } = self;

        install_crypto_provider();
        let tls = RustlsConfig::from_pem_file(&config.cert_file, &config.key_file)
            .await
            .with_context(|| {
                format!(
                    "failed to load TLS certificate {} and key {}",
                    config.cert_file.display(),
                    config.key_file.display()
                )
            })?;

        let https_addr = SocketAddr::from(([0, 0, 0, 0], config.https_port));
        tracing::info!(
            variant = %config.variant,
            "serving http on {} and https on {https_addr}",
            plain.local_addr().map(|a| a.to_string()).unwrap_or_default()
        );

        let tls_server = {
            let handle = tls_handle.clone();
            async move {
                axum_server::bind_rustls(https_addr, tls)
                    .handle(handle)
                    .serve(build_https_router().into_make_service_with_connect_info::<SocketAddr>())
                    .await
                    .with_context(|| format!("TLS listener on {https_addr} failed"))
            }
        };

        let plain_server = async move {
            axum::serve(
                plain,
                build_http_router(config.variant).into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("shutting down test server");
                tls_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
            })
            .await
            .context("plaintext listener failed")
        };

        tokio::try_join!(plain_server, tls_server)?;
        Ok(())
    }
}

/// Pick the process-wide rustls provider; several are linked in.
fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!("failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use refarch_types::config::ServerVariant;
    use tempfile::TempDir;
    use tokio::sync::oneshot;

    use super::*;

    fn write_certs(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
        let rcgen::CertifiedKey { cert, signing_key } =
            rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let cert_file = dir.join("localhost.crt");
        let key_file = dir.join("localhost.key");
        std::fs::write(&cert_file, cert.pem()).unwrap();
        std::fs::write(&key_file, signing_key.serialize_pem()).unwrap();
        (cert_file, key_file)
    }

    fn config(variant: ServerVariant, dir: &Path) -> ServerConfig {
        let (cert_file, key_file) = write_certs(dir);
        ServerConfig {
            variant,
            http_port: 0,
            https_port: 0,
            cert_file,
            key_file,
        }
    }

    fn client() -> reqwest::Client {
        reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn both_listeners_echo_and_shut_down() {
        let tmp = TempDir::new().unwrap();
        let server = TestServer::bind(config(ServerVariant::Echo, tmp.path()))
            .await
            .unwrap();
        let http_port = server.http_addr().unwrap().port();
        let tls_handle = server.tls_handle();

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let running = tokio::spawn(server.run(async move {
            let _ = stop_rx.await;
        }));
        let https_port = tls_handle.listening().await.unwrap().port();

        let client = client();
        let plain = client
            .get(format!("http://127.0.0.1:{http_port}/hello"))
            .send()
            .await
            .unwrap();
        assert_eq!(plain.status(), 200);
        assert_eq!(plain.headers()["content-type"], "text/plain");
        let body = plain.text().await.unwrap();
        assert!(body.starts_with("This is an example http server.\n\nGET /hello HTTP/1.1"));
        assert!(body.contains("RemoteAddr: 127.0.0.1:"));

        let tls = client
            .get(format!("https://127.0.0.1:{https_port}/hello"))
            .header("x-error-rate", "100")
            .send()
            .await
            .unwrap();
        assert_eq!(tls.status(), 200);
        let body = tls.text().await.unwrap();
        assert!(body.starts_with("This is an example https server.\n\nGET /hello HTTP/1.1"));

        drop(client);
        stop_tx.send(()).unwrap();
        running.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn fault_injecting_listener_honours_header() {
        let tmp = TempDir::new().unwrap();
        let server = TestServer::bind(config(ServerVariant::FaultInjecting, tmp.path()))
            .await
            .unwrap();
        let http_port = server.http_addr().unwrap().port();

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let running = tokio::spawn(server.run(async move {
            let _ = stop_rx.await;
        }));

        let client = client();
        let url = format!("http://127.0.0.1:{http_port}/");
        let failed = client
            .get(&url)
            .header("x-error-rate", "100")
            .send()
            .await
            .unwrap();
        assert_eq!(failed.status(), 500);
        assert_eq!(failed.text().await.unwrap(), "Server error!");

        let invalid = client
            .get(&url)
            .header("x-error-rate", "150")
            .send()
            .await
            .unwrap();
        assert_eq!(invalid.status(), 200);
        assert_eq!(invalid.text().await.unwrap(), "Invalid error rate: 150");

        drop(client);
        stop_tx.send(()).unwrap();
        running.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn missing_certificate_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let config = ServerConfig {
            cert_file: tmp.path().join("absent.crt"),
            key_file: tmp.path().join("absent.key"),
            http_port: 0,
            https_port: 0,
            variant: ServerVariant::Echo,
        };
        let server = TestServer::bind(config).await.unwrap();

        let err = server.run(std::future::pending::<()>()).await.unwrap_err();
        assert!(err.to_string().contains("failed to load TLS certificate"));
    }

    #[tokio::test]
    async fn tls_port_in_use_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let taken = TcpListener::bind("0.0.0.0:0").await.unwrap();
        let mut config = config(ServerVariant::Echo, tmp.path());
        config.https_port = taken.local_addr().unwrap().port();
        let server = TestServer::bind(config).await.unwrap();

        let err = server.run(std::future::pending::<()>()).await.unwrap_err();
        assert!(err.to_string().contains("TLS listener on"));
        drop(taken);
    }

    #[tokio::test]
    async fn port_in_use_is_fatal() {
        let taken = TcpListener::bind("0.0.0.0:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();
        let mut config = ServerConfig::for_variant(ServerVariant::Echo);
        config.http_port = port;

        let err = TestServer::bind(config).await.err().unwrap();
        assert!(err.to_string().contains("failed to bind plaintext listener"));
    }
}

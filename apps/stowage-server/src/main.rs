//! `stowage-server` serves one directory tree as S3-style buckets.
//!
//! Every first-level directory under `STORAGE_ROOT` is a bucket; files
//! below it are objects keyed by their relative path.
//!
//! ```text
//! STORAGE_ROOT=/srv/objects AUTH_BEARER=s3cr3t stowage-server
//! stowage-server --health-check   # exit status 0 when /health answers
//! ```
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:8080` | Socket to bind |
//! | `STORAGE_ROOT` | `./storage` | Directory holding the buckets |
//! | `PUBLIC_URL` | `http://localhost:8080` | Prefix of issued upload URLs |
//! | `AUTH_BEARER` | *(unset)* | Secret required for PUT, DELETE and URL issuance |
//! | `SIGNING_KEY` | *(unset)* | HMAC key for upload URLs, `AUTH_BEARER` when unset |
//! | `SIGNED_URL_DEFAULT_TTL` | `3600` | Upload URL lifetime in seconds |
//! | `LOG_LEVEL` | `info` | Filter used when `RUST_LOG` is absent |

use std::net::SocketAddr;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use stowage_core::{Gateway, GatewayConfig};
use stowage_http::GatewayService;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_level)
            .with_context(|| format!("LOG_LEVEL is not a valid filter: {log_level}"))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
    Ok(())
}

/// A wildcard bind address is not connectable; probe loopback instead.
fn probe_address(listen: &str) -> String {
    listen.replace("0.0.0.0", "127.0.0.1")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for ctrl-c, stopping");
    }
}

async fn serve(listener: TcpListener, service: GatewayService) -> Result<()> {
    let tracker = GracefulShutdown::new();
    let builder = HttpConnBuilder::new(TokioExecutor::new());
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            },
            () = &mut shutdown => break,
        };

        debug!(%peer, "accepted connection");
        let conn = builder
            .serve_connection(TokioIo::new(stream), service.clone())
            .into_owned();
        let conn = tracker.watch(conn);
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                error!(%peer, error = %e, "connection ended with error");
            }
        });
    }

    info!("stop requested, waiting for open connections");
    tracker.shutdown().await;
    info!("stowage server stopped");
    Ok(())
}

/// GET `/health` over a bare TCP connection and expect a running status.
async fn run_health_check(addr: &str) -> Result<()> {
    let mut stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("no gateway reachable at {addr}"))?;
    let request = format!("GET /health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await?;

    let mut reply = String::new();
    stream.read_to_string(&mut reply).await?;

    let ok_status = reply.lines().next().is_some_and(|line| line.contains(" 200 "));
    anyhow::ensure!(
        ok_status && reply.contains("\"status\":\"running\""),
        "gateway at {addr} is not healthy"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = GatewayConfig::from_env();

    if std::env::args().skip(1).any(|arg| arg == "--health-check") {
        let healthy = run_health_check(&probe_address(&config.gateway_listen))
            .await
            .is_ok();
        std::process::exit(i32::from(!healthy));
    }

    init_tracing(&config.log_level)?;

    let addr: SocketAddr = config
        .gateway_listen
        .parse()
        .with_context(|| format!("GATEWAY_LISTEN is not a socket address: {}", config.gateway_listen))?;

    info!(
        version = VERSION,
        %addr,
        storage_root = %config.storage_root,
        public_url = %config.public_url,
        bearer_set = config.auth_bearer.is_some(),
        signing_set = config.effective_signing_key().is_some(),
        "configuration loaded",
    );

    let gateway = Gateway::open(config)
        .await
        .context("cannot open storage root")?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    info!(%addr, "stowage server ready");

    serve(listener, GatewayService::new(gateway)).await
}

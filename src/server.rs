//! Web server

use crate::cli;

use std::{net::SocketAddr, path::PathBuf, process::exit, str::FromStr, time::Duration};

use axum::ServiceExt;
use axum_server::{tls_rustls::RustlsConfig, Handle};
use expanduser::expanduser;
use tokio::signal;

/// Serve the dashboard service
///
/// # Arguments
///
/// * `args`: Command line arguments
/// * `service`: The [crate::app::Service] to serve
pub async fn serve(args: &cli::CommandLineArgs, service: crate::app::Service) {
    let addr = SocketAddr::from_str(&format!("{}:{}", args.host, args.port))
        .expect("invalid host name, IP address or port number");

    // Catch ctrl+c and try to shutdown gracefully
    let handle = Handle::new();
    tokio::spawn(shutdown_signal(
        handle.clone(),
        args.graceful_shutdown_timeout,
    ));

    let scheme = if args.https { "https" } else { "http" };
    tracing::info!("Listening on {}://{}", scheme, addr);
    let result = if args.https {
        let tls_config = RustlsConfig::from_pem_file(
            resolve_tls_file(&args.cert_file, "certificate"),
            resolve_tls_file(&args.key_file, "key"),
        )
        .await
        .expect("Failed to load TLS certificate files");
        axum_server::bind_rustls(addr, tls_config)
            .handle(handle)
            .serve(service.into_make_service())
            .await
    } else {
        axum_server::bind(addr)
            .handle(handle)
            .serve(service.into_make_service())
            .await
    };
    if let Err(err) = result {
        tracing::error!("Server failed on {}://{}: {}", scheme, addr, err);
        exit(1)
    }
}

/// Resolve a TLS file path given on the command line to an absolute path.
///
/// `~` is expanded. Exits the process if the file cannot be found.
fn resolve_tls_file(path: &str, kind: &str) -> PathBuf {
    match expanduser(path).and_then(|path| path.canonicalize()) {
        Ok(path) => path,
        Err(err) => {
            tracing::error!("TLS {} file '{}' not usable: {}", kind, path, err);
            exit(1)
        }
    }
}

/// Graceful shutdown handler
///
/// Installs signal handlers to catch Ctrl-C or SIGTERM and trigger a graceful shutdown.
async fn shutdown_signal(handle: Handle, timeout: u64) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("signal received, starting graceful shutdown");
    // Force shutdown if draining takes longer than the configured timeout
    handle.graceful_shutdown(Some(Duration::from_secs(timeout)));
}

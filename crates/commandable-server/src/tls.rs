//! HTTPS listener: PEM credentials, rustls config and the accept loop.

use axum::Router;
use commandable_core::{ApplicationError, ConfigParams};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use rustls::ServerConfig;
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, warn};

/// Pause after a failed accept, e.g. when out of file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Paths from the `credential` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialParams {
    pub ssl_key_file: Option<String>,
    pub ssl_crt_file: Option<String>,
    pub ssl_ca_file: Option<String>,
}

impl CredentialParams {
    pub fn from_config(config: &ConfigParams) -> Self {
        Self {
            ssl_key_file: config.get_as_nullable_string("credential.ssl_key_file"),
            ssl_crt_file: config.get_as_nullable_string("credential.ssl_crt_file"),
            ssl_ca_file: config.get_as_nullable_string("credential.ssl_ca_file"),
        }
    }
}

/// Build a server config from PEM files. CA certificates extend the chain.
pub(crate) fn load_server_config(
    correlation_id: Option<&str>,
    credentials: &CredentialParams,
) -> Result<Arc<ServerConfig>, ApplicationError> {
    let key_file = credentials.ssl_key_file.as_deref().ok_or_else(|| {
        ApplicationError::config(
            correlation_id,
            "NO_SSL_KEY_FILE",
            "SSL key file is not configured",
        )
    })?;
    let crt_file = credentials.ssl_crt_file.as_deref().ok_or_else(|| {
        ApplicationError::config(
            correlation_id,
            "NO_SSL_CRT_FILE",
            "SSL certificate file is not configured",
        )
    })?;

    let mut chain = read_certs(correlation_id, crt_file)?;
    if let Some(ca_file) = credentials.ssl_ca_file.as_deref() {
        chain.extend(read_certs(correlation_id, ca_file)?);
    }
    let key = PrivateKeyDer::from_pem_file(key_file).map_err(|e| {
        ApplicationError::config(
            correlation_id,
            "CANNOT_READ_SSL_KEY",
            "Failed to read SSL key file",
        )
        .with_details("path", key_file)
        .with_cause(e)
    })?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .and_then(|b| b.with_no_client_auth().with_single_cert(chain, key))
        .map_err(|e| {
            ApplicationError::config(
                correlation_id,
                "BAD_SSL_CREDENTIALS",
                "Failed to build TLS configuration",
            )
            .with_cause(e)
        })?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
    Ok(Arc::new(config))
}

fn read_certs(
    correlation_id: Option<&str>,
    path: &str,
) -> Result<Vec<CertificateDer<'static>>, ApplicationError> {
    let fail = |e: rustls_pki_types::pem::Error| {
        ApplicationError::config(
            correlation_id,
            "CANNOT_READ_SSL_CRT",
            "Failed to read SSL certificate file",
        )
        .with_details("path", path)
        .with_cause(e)
    };
    CertificateDer::pem_file_iter(path)
        .map_err(fail)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(fail)
}

/// Accept TLS connections until `shutdown` fires.
pub(crate) async fn serve(
    listener: TcpListener,
    config: Arc<ServerConfig>,
    app: Router,
    mut shutdown: oneshot::Receiver<()>,
) {
    let acceptor = TlsAcceptor::from(config);
    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            },
            _ = &mut shutdown => break,
        };

        let acceptor = acceptor.clone();
        let service = TowerToHyperService::new(app.clone());
        tokio::spawn(async move {
            let stream = match acceptor.accept(stream).await {
                Ok(stream) => stream,
                Err(e) => {
                    debug!(%peer, "TLS handshake failed: {}", e);
                    return;
                }
            };
            if let Err(e) = auto::Builder::new(TokioExecutor::new())
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                debug!(%peer, "Connection closed with error: {}", e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_credential_section() {
        let config = ConfigParams::from_tuples([
            ("credential.ssl_key_file", "key.pem"),
            ("credential.ssl_crt_file", "crt.pem"),
        ]);
        let creds = CredentialParams::from_config(&config);
        assert_eq!(creds.ssl_key_file.as_deref(), Some("key.pem"));
        assert_eq!(creds.ssl_ca_file, None);
    }

    #[test]
    fn missing_files_are_config_errors() {
        let err = load_server_config(None, &CredentialParams::default()).unwrap_err();
        assert_eq!(err.code(), "NO_SSL_KEY_FILE");

        let creds = CredentialParams {
            ssl_key_file: Some("/nonexistent/key.pem".to_string()),
            ssl_crt_file: Some("/nonexistent/crt.pem".to_string()),
            ssl_ca_file: None,
        };
        let err = load_server_config(None, &creds).unwrap_err();
        assert_eq!(err.code(), "CANNOT_READ_SSL_CRT");
    }
}

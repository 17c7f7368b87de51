//! Production transport using hyper-util.

use std::collections::{HashMap, VecDeque};
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use courier_core::{
    BuiltRequest, DeferredResponse, Error, ProgressSender, ProgressUpdate, RequestTask, Response,
    Result, UploadSource, progress_channel,
};
use http_body::{Body, Frame, SizeHint};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tokio::sync::oneshot;
use tracing::debug;

use crate::config::TransportConfig;
use crate::connector::https_connector;
use crate::transport::Transport;

/// Request body type handed to the hyper client; plain sends box a
/// [`Full`] body, uploads box a [`CountingBody`].
type TransportBody = BoxBody<Bytes, Infallible>;

/// HTTP transport over the hyper-util legacy client, with connection
/// pooling and rustls TLS.
///
/// Upload and download transfers run on a spawned task so progress
/// flows while the deferred response is still pending; dropping every
/// consumer of a transfer's progress stream aborts the transfer.
///
/// # Example
///
/// ```ignore
/// let transport = HyperTransport::builder()
///     .connect_timeout(Duration::from_secs(5))
///     .build();
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpsConnector<HttpConnector>, TransportBody>,
    config: TransportConfig,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperTransport {
    /// Create a transport with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(TransportConfig::default())
    }

    /// Create a transport with custom configuration.
    #[must_use]
    pub fn with_config(config: TransportConfig) -> Self {
        let connector = https_connector(config.connect_timeout);
        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .build(connector);

        Self { client, config }
    }

    /// Create a configuration builder for this transport.
    #[must_use]
    pub fn builder() -> crate::config::TransportConfigBuilder {
        TransportConfig::builder()
    }

    /// The transport configuration.
    #[must_use]
    pub const fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Build a hyper request from a built request.
    fn build_http_request(
        request: &BuiltRequest,
        body: TransportBody,
    ) -> Result<http::Request<TransportBody>> {
        let mut builder = http::Request::builder()
            .method(request.method().clone())
            .uri(request.url().as_str());

        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder.body(body).map_err(|e| Error::build(e.to_string()))
    }

    /// Extract response headers as a `HashMap`.
    fn extract_headers(headers: &http::HeaderMap) -> HashMap<String, String> {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect()
    }

    async fn perform(&self, request: &BuiltRequest, body: TransportBody) -> Result<Response> {
        let http_request = Self::build_http_request(request, body)?;

        let response = tokio::time::timeout(request.timeout(), self.client.request(http_request))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(map_client_error)?;

        let status = response.status().as_u16();
        let response_headers = Self::extract_headers(response.headers());

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| Error::connection(e.to_string()))?
            .to_bytes();

        Ok(Response::new(status, response_headers, body))
    }

    /// Encode the upload source into body bytes, applying the content
    /// type the source implies when the request has none.
    async fn encode_source(source: UploadSource, request: &mut BuiltRequest) -> Result<Bytes> {
        match source {
            UploadSource::Bytes(data) => {
                request.set_header_if_absent("Content-Type", "application/octet-stream");
                Ok(data)
            }
            UploadSource::File(path) => {
                request.set_header_if_absent("Content-Type", "application/octet-stream");
                let data = tokio::fs::read(&path)
                    .await
                    .map_err(|e| Error::io(format!("reading {}: {e}", path.display())))?;
                Ok(Bytes::from(data))
            }
            UploadSource::Multipart(form) => {
                request.set_header_if_absent("Content-Type", form.content_type());
                Ok(form.encode())
            }
        }
    }

    /// Receive a response publishing download progress per body frame.
    async fn receive_counted(
        &self,
        request: &BuiltRequest,
        progress: &ProgressSender,
    ) -> Result<Response> {
        let http_request =
            Self::build_http_request(request, Full::<Bytes>::default().boxed())?;

        let receive = async {
            let response = self
                .client
                .request(http_request)
                .await
                .map_err(map_client_error)?;

            let status = response.status().as_u16();
            let headers = Self::extract_headers(response.headers());
            let total: Option<u64> = headers.get("content-length").and_then(|v| v.parse().ok());

            let mut body = response.into_body();
            let mut collected = BytesMut::new();
            let mut completed: u64 = 0;
            while let Some(frame) = body.frame().await {
                let frame = frame.map_err(|e| Error::connection(e.to_string()))?;
                if let Ok(data) = frame.into_data() {
                    completed += data.len() as u64;
                    collected.extend_from_slice(&data);
                    progress.send(ProgressUpdate::new(completed, total));
                }
            }
            progress.send(ProgressUpdate::new(completed, total.or(Some(completed))));

            Ok(Response::new(status, headers, collected.freeze()))
        };

        tokio::time::timeout(request.timeout(), receive)
            .await
            .map_err(|_| Error::Timeout)?
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn send(&self, request: &BuiltRequest) -> Result<Response> {
        let body = request
            .body()
            .cloned()
            .map_or_else(|| Full::<Bytes>::default().boxed(), |b| Full::new(b).boxed());
        self.perform(request, body).await
    }

    async fn upload(&self, request: &BuiltRequest, source: UploadSource) -> Result<RequestTask> {
        let mut request = request.clone();
        let payload = Self::encode_source(source, &mut request).await?;
        let total = payload.len() as u64;

        let (sender, stream) = progress_channel();
        let sender = Arc::new(sender);
        let body = CountingBody::new(
            payload,
            self.config.upload_chunk_size,
            total,
            Arc::clone(&sender),
        );

        let transport = self.clone();
        let (done_tx, done_rx) = oneshot::channel();
        tokio::spawn(async move {
            let outcome = tokio::select! {
                result = transport.perform(&request, body.boxed()) => result,
                () = sender.closed() => {
                    debug!(url = %request.url(), "upload cancelled, all progress consumers dropped");
                    Err(Error::Cancelled)
                }
            };
            if outcome.is_ok() {
                sender.send(ProgressUpdate::new(total, Some(total)));
            }
            let _ = done_tx.send(outcome);
        });

        let response =
            DeferredResponse::new(async move { done_rx.await.unwrap_or(Err(Error::Cancelled)) });
        Ok(RequestTask::new(Some(stream), response))
    }

    async fn download(&self, request: &BuiltRequest) -> Result<RequestTask> {
        let request = request.clone();
        let (sender, stream) = progress_channel();

        let transport = self.clone();
        let (done_tx, done_rx) = oneshot::channel();
        tokio::spawn(async move {
            let outcome = tokio::select! {
                result = transport.receive_counted(&request, &sender) => result,
                () = sender.closed() => {
                    debug!(url = %request.url(), "download cancelled, all progress consumers dropped");
                    Err(Error::Cancelled)
                }
            };
            let _ = done_tx.send(outcome);
        });

        let response =
            DeferredResponse::new(async move { done_rx.await.unwrap_or(Err(Error::Cancelled)) });
        Ok(RequestTask::new(Some(stream), response))
    }
}

#[allow(clippy::needless_pass_by_value)]
fn map_client_error(err: hyper_util::client::legacy::Error) -> Error {
    let msg = err.to_string();

    if err.is_connect() {
        return Error::connection(msg);
    }

    if msg.contains("ssl") || msg.contains("tls") || msg.contains("certificate") {
        return Error::tls(msg);
    }

    Error::connection(msg)
}

/// Request body that publishes upload progress as chunks are consumed
/// by the connection.
struct CountingBody {
    chunks: VecDeque<Bytes>,
    sent: u64,
    total: u64,
    progress: Arc<ProgressSender>,
}

impl CountingBody {
    fn new(payload: Bytes, chunk_size: usize, total: u64, progress: Arc<ProgressSender>) -> Self {
        let mut chunks = VecDeque::new();
        let mut rest = payload;
        while rest.len() > chunk_size {
            chunks.push_back(rest.split_to(chunk_size));
        }
        if !rest.is_empty() {
            chunks.push_back(rest);
        }
        Self {
            chunks,
            sent: 0,
            total,
            progress,
        }
    }
}

impl Body for CountingBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<std::result::Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        match this.chunks.pop_front() {
            Some(chunk) => {
                this.sent += chunk.len() as u64;
                this.progress
                    .send(ProgressUpdate::new(this.sent, Some(this.total)));
                Poll::Ready(Some(Ok(Frame::data(chunk))))
            }
            None => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        self.chunks.is_empty()
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.total - self.sent)
    }
}

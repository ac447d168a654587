use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use bytes::{Buf, BufMut, Bytes};
use tonic::codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder};
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint, Identity};
use tonic::{Code, Status};

use uphook_core::codec::pb;
use uphook_core::{HookCodec, HookConfig, HookError, HookRequest, HookResponse, ProtobufCodec};

use super::HookHandler;

/// Passes already-encoded protobuf messages through tonic untouched, so the
/// wire format stays owned by [`ProtobufCodec`].
#[derive(Debug, Clone, Copy, Default)]
struct RawCodec;

impl Codec for RawCodec {
    type Encode = Bytes;
    type Decode = Bytes;
    type Encoder = RawCodec;
    type Decoder = RawCodec;

    fn encoder(&mut self) -> Self::Encoder {
        RawCodec
    }

    fn decoder(&mut self) -> Self::Decoder {
        RawCodec
    }
}

impl Encoder for RawCodec {
    type Item = Bytes;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        dst.put(item);
        Ok(())
    }
}

impl Decoder for RawCodec {
    type Item = Bytes;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        Ok(Some(src.copy_to_bytes(src.remaining())))
    }
}

/// TLS material read from disk
#[derive(Debug, Clone, Default)]
pub struct GrpcTlsFiles {
    pub server_ca: Option<String>,
    pub client_certificate: Option<String>,
    pub client_key: Option<String>,
}

/// Calls the unary `InvokeHook` method of a gRPC hook handler
pub struct GrpcHook {
    endpoint: String,
    channel: Channel,
    /// Deadline propagated to the handler as `grpc-timeout`
    timeout: Duration,
    codec: ProtobufCodec,
}

impl GrpcHook {
    /// Create a hook over a lazily connected channel. With `tls` set the
    /// channel uses TLS, trusting `server_ca` when given and the native
    /// roots otherwise.
    pub async fn connect(
        endpoint: impl Into<String>,
        connect_timeout: Duration,
        timeout: Duration,
        tls: Option<GrpcTlsFiles>,
    ) -> anyhow::Result<Self> {
        let endpoint = endpoint.into();
        let mut channel = Endpoint::from_shared(endpoint.clone())
            .with_context(|| format!("Invalid gRPC hook endpoint: {}", endpoint))?
            .connect_timeout(connect_timeout);

        if let Some(files) = tls {
            channel = channel
                .tls_config(load_tls_config(&files).await?)
                .context("Failed to configure TLS for gRPC hook")?;
        }

        Ok(Self {
            endpoint,
            channel: channel.connect_lazy(),
            timeout,
            codec: ProtobufCodec,
        })
    }

    pub async fn from_config(config: &HookConfig) -> anyhow::Result<Self> {
        let endpoint = config
            .grpc_endpoint
            .clone()
            .context("HOOKS_GRPC_ENDPOINT must be set")?;
        let tls = config.grpc_secure.then(|| GrpcTlsFiles {
            server_ca: config.grpc_server_tls_certificate.clone(),
            client_certificate: config.grpc_client_tls_certificate.clone(),
            client_key: config.grpc_client_tls_key.clone(),
        });
        Self::connect(
            endpoint,
            config.http_connect_timeout(),
            config.timeout(),
            tls,
        )
        .await
    }
}

async fn load_tls_config(files: &GrpcTlsFiles) -> anyhow::Result<ClientTlsConfig> {
    let mut tls = ClientTlsConfig::new();

    match &files.server_ca {
        Some(path) => {
            let pem = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read server TLS certificate {}", path))?;
            tls = tls.ca_certificate(Certificate::from_pem(pem));
        }
        None => tls = tls.with_native_roots(),
    }

    if let (Some(cert_path), Some(key_path)) = (&files.client_certificate, &files.client_key) {
        let cert = tokio::fs::read(cert_path)
            .await
            .with_context(|| format!("Failed to read client TLS certificate {}", cert_path))?;
        let key = tokio::fs::read(key_path)
            .await
            .with_context(|| format!("Failed to read client TLS key {}", key_path))?;
        tls = tls.identity(Identity::from_pem(cert, key));
    }

    Ok(tls)
}

fn classify_status(status: Status, timeout: Duration) -> HookError {
    match status.code() {
        Code::Unavailable => HookError::Unreachable(status.message().to_string()),
        Code::DeadlineExceeded => HookError::Timeout(timeout),
        Code::Cancelled => HookError::Cancelled,
        code => HookError::HandlerError(format!("{:?}: {}", code, status.message())),
    }
}

#[async_trait]
impl HookHandler for GrpcHook {
    fn name(&self) -> &'static str {
        "grpc"
    }

    #[tracing::instrument(
        skip(self, request),
        fields(endpoint = %self.endpoint, hook_type = %request.hook_type())
    )]
    async fn invoke_hook(&self, request: &HookRequest) -> Result<HookResponse, HookError> {
        let payload = self
            .codec
            .encode_request(request)
            .map_err(|e| HookError::Encode(e.to_string()))?;

        let mut client = tonic::client::Grpc::new(self.channel.clone());
        client
            .ready()
            .await
            .map_err(|e| HookError::Unreachable(e.to_string()))?;

        let mut grpc_request = tonic::Request::new(Bytes::from(payload));
        grpc_request.set_timeout(self.timeout);

        let response = client
            .unary(
                grpc_request,
                PathAndQuery::from_static(pb::INVOKE_HOOK_PATH),
                RawCodec,
            )
            .await
            .map_err(|status| classify_status(status, self.timeout))?;

        self.codec
            .decode_response(&response.into_inner())
            .map_err(|e| HookError::MalformedResponse(e.to_string()))
    }
}

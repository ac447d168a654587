use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::body::BoxBody;
use tonic::codec::ProstCodec;
use tonic::codegen::{empty_body, http, Body, BoxFuture, Context, Poll, Service, StdError};
use tonic::server::{Grpc, NamedService, UnaryService};
use tonic::transport::Server;
use tonic::{Code, Status};

use uphook_core::codec::pb;
use uphook_core::{HookError, HookEvent, HookType, HttpRequest, HttpResponse, Outcome, Upload};
use uphook_infra::{Dispatcher, GrpcHook};

/// What the handler saw of one call
#[derive(Debug, Clone)]
struct Received {
    hook_type: String,
    upload_id: String,
    had_deadline: bool,
}

/// In-process `v2.HookHandler` answering every call with a fixed reply
#[derive(Clone)]
struct HookHandlerServer {
    reply: Result<pb::HookResponse, (Code, String)>,
    received: Arc<Mutex<Vec<Received>>>,
}

impl NamedService for HookHandlerServer {
    const NAME: &'static str = "v2.HookHandler";
}

struct InvokeHook {
    server: HookHandlerServer,
    had_deadline: bool,
}

impl UnaryService<pb::HookRequest> for InvokeHook {
    type Response = pb::HookResponse;
    type Future = BoxFuture<tonic::Response<Self::Response>, Status>;

    fn call(&mut self, request: tonic::Request<pb::HookRequest>) -> Self::Future {
        let request = request.into_inner();
        let upload_id = request
            .event
            .as_ref()
            .and_then(|event| event.upload.as_ref())
            .map(|upload| upload.id.clone())
            .unwrap_or_default();
        self.server.received.lock().unwrap().push(Received {
            hook_type: request.r#type,
            upload_id,
            had_deadline: self.had_deadline,
        });

        let reply = self.server.reply.clone();
        Box::pin(async move {
            match reply {
                Ok(response) => Ok(tonic::Response::new(response)),
                Err((code, message)) => Err(Status::new(code, message)),
            }
        })
    }
}

impl<B> Service<http::Request<B>> for HookHandlerServer
where
    B: Body + Send + 'static,
    B::Error: Into<StdError> + Send + 'static,
{
    type Response = http::Response<BoxBody>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        if req.uri().path() != pb::INVOKE_HOOK_PATH {
            return Box::pin(async move {
                let mut response = http::Response::new(empty_body());
                let headers = response.headers_mut();
                headers.insert("grpc-status", http::HeaderValue::from_static("12"));
                headers.insert(
                    http::header::CONTENT_TYPE,
                    http::HeaderValue::from_static("application/grpc"),
                );
                Ok(response)
            });
        }

        let method = InvokeHook {
            server: self.clone(),
            had_deadline: req.headers().contains_key("grpc-timeout"),
        };
        Box::pin(async move {
            let codec: ProstCodec<pb::HookResponse, pb::HookRequest> = ProstCodec::default();
            Ok(Grpc::new(codec).unary(method, req).await)
        })
    }
}

async fn spawn_handler(
    reply: Result<pb::HookResponse, (Code, String)>,
) -> (SocketAddr, Arc<Mutex<Vec<Received>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let received = Arc::new(Mutex::new(Vec::new()));
    let server = HookHandlerServer {
        reply,
        received: received.clone(),
    };

    tokio::spawn(async move {
        Server::builder()
            .add_service(server)
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    (addr, received)
}

async fn dispatcher(addr: SocketAddr) -> Dispatcher {
    let hook = GrpcHook::connect(
        format!("http://{}", addr),
        Duration::from_secs(2),
        Duration::from_secs(5),
        None,
    )
    .await
    .unwrap();
    Dispatcher::new(Arc::new(hook), Duration::from_secs(5))
}

fn pre_create_event() -> HookEvent {
    let mut upload = Upload::new("upload-7");
    upload.size = Some(2048);
    let http_request = HttpRequest {
        method: "POST".to_string(),
        uri: "/files".to_string(),
        remote_addr: "10.0.0.1:5000".to_string(),
        ..Default::default()
    };
    HookEvent::new(upload, http_request)
}

#[tokio::test]
async fn test_rejecting_grpc_handler_end_to_end() {
    let reply = pb::HookResponse {
        reject_upload: true,
        http_response: Some(pb::HttpResponse {
            status_code: Some(403),
            body: Some("quota exceeded".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    };
    let (addr, received) = spawn_handler(Ok(reply)).await;

    let resolution = dispatcher(addr)
        .await
        .invoke(HookType::PreCreate, pre_create_event())
        .await
        .unwrap();

    assert_eq!(
        resolution.outcome,
        Outcome::Reject(HttpResponse::new(403).with_body("quota exceeded"))
    );

    let received = received.lock().unwrap().clone();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].hook_type, "pre-create");
    assert_eq!(received[0].upload_id, "upload-7");
    assert!(received[0].had_deadline);
}

#[tokio::test]
async fn test_grpc_internal_status_is_handler_error() {
    let (addr, received) =
        spawn_handler(Err((Code::Internal, "database is down".to_string()))).await;

    let err = dispatcher(addr)
        .await
        .invoke(HookType::PreCreate, pre_create_event())
        .await
        .unwrap_err();

    match err {
        HookError::HandlerError(message) => assert!(message.contains("database is down")),
        other => panic!("expected handler error, got {:?}", other),
    }
    assert_eq!(received.lock().unwrap().len(), 1);
}

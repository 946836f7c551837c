//! HTTP entry point for sync requests
//!
//! Routing is a plain function from (method, path, authorization) to a
//! status and JSON body; a fixed pool of tiny_http workers only adapts
//! requests and responses around it.

use anyhow::{Result, anyhow};
use log::{error, info, warn};
use mail::{MailStore, RemoteMailbox, SyncError, SyncOptions, SyncReport};
use serde_json::{Value, json};
use std::io::Cursor;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tiny_http::{Header, Request, Response, Server, StatusCode};

/// Headers attached to every response
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    (
        "Access-Control-Allow-Headers",
        "authorization, x-client-info, apikey, content-type",
    ),
    ("Access-Control-Allow-Methods", "POST, OPTIONS"),
];

/// Status and optional JSON body of a response
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Option<Value>,
}

impl Reply {
    fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self::json(status, json!({ "error": message.into() }))
    }
}

/// Dependencies shared by all request threads
pub struct SyncService {
    store: Arc<dyn MailStore>,
    remote: Arc<dyn RemoteMailbox>,
    options: SyncOptions,
}

impl SyncService {
    pub fn new(
        store: Arc<dyn MailStore>,
        remote: Arc<dyn RemoteMailbox>,
        options: SyncOptions,
    ) -> Self {
        Self {
            store,
            remote,
            options,
        }
    }

    /// Run a sync for the caller identified by `authorization`
    pub fn sync(&self, authorization: Option<&str>) -> Result<SyncReport, SyncError> {
        let user_id = mail::authenticate(authorization, self.store.as_ref())?;
        mail::sync_account(
            self.remote.as_ref(),
            self.store.as_ref(),
            &user_id,
            &self.options,
        )
    }

    /// Route one request
    pub fn route(&self, method: &str, url: &str, authorization: Option<&str>) -> Reply {
        let path = url.split('?').next().unwrap_or_default();

        if method.eq_ignore_ascii_case("OPTIONS") {
            return Reply {
                status: 204,
                body: None,
            };
        }

        if path != "/" && path != "/sync" {
            return Reply::error(404, "Not found");
        }
        if !method.eq_ignore_ascii_case("POST") {
            return Reply::error(405, "Method not allowed");
        }

        match self.sync(authorization) {
            Ok(report) => Reply::json(
                200,
                json!({
                    "success": true,
                    "synced": report.attempted,
                    "inserted": report.inserted,
                }),
            ),
            Err(e) => {
                let status = e.status_code();
                if status >= 500 {
                    error!("Sync request failed: {}", e);
                } else {
                    warn!("Sync request rejected: {}", e);
                }
                Reply::error(status, e.to_string())
            }
        }
    }
}

fn to_response(reply: Reply) -> Response<Cursor<Vec<u8>>> {
    let data = reply
        .body
        .map(|body| body.to_string().into_bytes())
        .unwrap_or_default();
    let has_body = !data.is_empty();

    let mut response = Response::from_data(data).with_status_code(StatusCode(reply.status));
    let mut headers: Vec<(&str, &str)> = CORS_HEADERS.to_vec();
    if has_body {
        headers.push(("Content-Type", "application/json"));
    }
    for (name, value) in headers {
        if let Ok(header) = Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            response.add_header(header);
        }
    }
    response
}

fn handle(service: &SyncService, request: Request) {
    let method = request.method().as_str().to_string();
    let url = request.url().to_string();
    let authorization = request
        .headers()
        .iter()
        .find(|h| h.field.equiv("Authorization"))
        .map(|h| h.value.as_str().to_string());

    let reply = service.route(&method, &url, authorization.as_deref());
    info!("{} {} -> {}", method, url, reply.status);

    if let Err(e) = request.respond(to_response(reply)) {
        warn!("Failed to send response: {}", e);
    }
}

/// Bind the HTTP listener
pub fn bind(addr: &str) -> Result<Server> {
    let server = Server::http(addr).map_err(|e| anyhow!("Failed to bind {}: {}", addr, e))?;
    match server.server_addr().to_ip() {
        Some(bound) => info!("Sync endpoint listening on http://{}", bound),
        None => info!("Sync endpoint listening on {}", addr),
    }
    Ok(server)
}

/// Start `workers` threads that take requests off the listener.
///
/// Requests beyond the worker count queue in the listener until a worker is
/// free.
pub fn spawn_workers(
    server: Arc<Server>,
    service: Arc<SyncService>,
    workers: usize,
) -> Vec<JoinHandle<()>> {
    (0..workers)
        .map(|n| {
            let server = Arc::clone(&server);
            let service = Arc::clone(&service);
            thread::spawn(move || {
                loop {
                    match server.recv() {
                        Ok(request) => handle(&service, request),
                        Err(e) => {
                            error!("Worker {} stopped: {}", n, e);
                            break;
                        }
                    }
                }
            })
        })
        .collect()
}

/// Serve requests on a fixed pool of worker threads until the listener
/// fails
pub fn serve(service: Arc<SyncService>, addr: &str, workers: usize) -> Result<()> {
    let server = Arc::new(bind(addr)?);
    for worker in spawn_workers(server, service, workers) {
        if worker.join().is_err() {
            error!("Worker thread panicked");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mail::gmail::api::{GmailMessage, Header as GmailHeader, MessagePayload};
    use mail::{Account, Credential, InMemoryMailStore, MessageId, RemoteError};

    /// Provider returning the same listing and a valid detail for every ID
    struct StaticRemote {
        ids: Vec<&'static str>,
        list_status: Option<u16>,
    }

    impl RemoteMailbox for StaticRemote {
        fn list_message_ids(
            &self,
            _credential: &Credential,
            _max_results: usize,
            _query: &str,
        ) -> Result<Vec<MessageId>, RemoteError> {
            match self.list_status {
                Some(401) => Err(RemoteError::Auth { status: 401 }),
                Some(status) => Err(RemoteError::Provider {
                    operation: "list messages",
                    status,
                }),
                None => Ok(self.ids.iter().map(|id| MessageId::new(*id)).collect()),
            }
        }

        fn get_message(
            &self,
            _credential: &Credential,
            id: &MessageId,
        ) -> Result<GmailMessage, RemoteError> {
            Ok(GmailMessage {
                id: id.0.clone(),
                thread_id: "t1".to_string(),
                label_ids: Some(vec!["INBOX".to_string()]),
                snippet: "Hi".to_string(),
                payload: Some(MessagePayload {
                    headers: Some(vec![GmailHeader {
                        name: "Date".to_string(),
                        value: "Mon, 10 Feb 2025 10:00:00 +0000".to_string(),
                    }]),
                    ..Default::default()
                }),
            })
        }
    }

    fn make_service(list_status: Option<u16>) -> (SyncService, Arc<InMemoryMailStore>) {
        let store = Arc::new(InMemoryMailStore::new());
        store.create_session("linked", "token-linked").unwrap();
        store.create_session("unlinked", "token-unlinked").unwrap();
        store
            .create_account(
                Account::new("linked", "linked@example.com").with_credential(Credential::new("g")),
            )
            .unwrap();

        let remote = Arc::new(StaticRemote {
            ids: vec!["a", "b"],
            list_status,
        });
        let service = SyncService::new(store.clone(), remote, SyncOptions::default());
        (service, store)
    }

    #[test]
    fn test_preflight() {
        let (service, _) = make_service(None);
        let reply = service.route("OPTIONS", "/sync", None);
        assert_eq!(reply.status, 204);
        assert!(reply.body.is_none());
    }

    #[test]
    fn test_unknown_route_and_method() {
        let (service, _) = make_service(None);
        assert_eq!(service.route("POST", "/other", None).status, 404);
        assert_eq!(service.route("GET", "/sync", None).status, 405);
    }

    #[test]
    fn test_sync_success() {
        let (service, store) = make_service(None);
        let reply = service.route("POST", "/sync?source=ui", Some("Bearer token-linked"));

        assert_eq!(reply.status, 200);
        assert_eq!(
            reply.body,
            Some(json!({ "success": true, "synced": 2, "inserted": 2 }))
        );

        let account = store.find_account_for_user("linked").unwrap().unwrap();
        assert_eq!(store.count_messages(account.id).unwrap(), 2);

        // Second run lists the same IDs but stores nothing new
        let reply = service.route("POST", "/", Some("Bearer token-linked"));
        assert_eq!(
            reply.body,
            Some(json!({ "success": true, "synced": 2, "inserted": 0 }))
        );
    }

    #[test]
    fn test_error_statuses() {
        let (service, _) = make_service(None);

        let reply = service.route("POST", "/sync", None);
        assert_eq!(reply, Reply::error(401, "Unauthorized"));

        let reply = service.route("POST", "/sync", Some("Bearer token-unlinked"));
        assert_eq!(reply.status, 400);
        assert_eq!(
            reply.body,
            Some(json!({ "error": "No mail account linked for user unlinked" }))
        );

        let (service, _) = make_service(Some(503));
        assert_eq!(
            service
                .route("POST", "/sync", Some("Bearer token-linked"))
                .status,
            502
        );
    }

    #[test]
    fn test_response_carries_cors_headers() {
        let response = to_response(Reply::error(404, "Not found"));
        assert_eq!(response.status_code(), StatusCode(404));
        for (name, _) in CORS_HEADERS {
            assert!(response.headers().iter().any(|h| h.field.equiv(name)));
        }
        assert!(
            response
                .headers()
                .iter()
                .any(|h| h.field.equiv("Content-Type"))
        );
    }

    fn send_raw(addr: std::net::SocketAddr, request: &str) -> String {
        use std::io::{Read, Write};

        let mut stream = std::net::TcpStream::connect(addr).unwrap();
        stream.write_all(request.as_bytes()).unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    #[test]
    fn test_worker_pool_serves_more_requests_than_workers() {
        let (service, store) = make_service(None);
        let server = Arc::new(bind("127.0.0.1:0").unwrap());
        let addr = server.server_addr().to_ip().unwrap();
        let workers = spawn_workers(server, Arc::new(service), 2);
        assert_eq!(workers.len(), 2);

        let clients: Vec<_> = (0..6)
            .map(|_| {
                thread::spawn(move || {
                    send_raw(
                        addr,
                        "POST /sync HTTP/1.1\r\nHost: localhost\r\n\
                         Authorization: Bearer token-linked\r\n\
                         Content-Length: 0\r\nConnection: close\r\n\r\n",
                    )
                })
            })
            .collect();

        for client in clients {
            let response = client.join().unwrap();
            assert!(response.starts_with("HTTP/1.1 200"), "{}", response);
            assert!(response.contains("\"synced\":2"));
        }

        let account = store.find_account_for_user("linked").unwrap().unwrap();
        assert_eq!(store.count_messages(account.id).unwrap(), 2);
    }

    #[test]
    fn test_worker_pool_answers_preflight() {
        let (service, _) = make_service(None);
        let server = Arc::new(bind("127.0.0.1:0").unwrap());
        let addr = server.server_addr().to_ip().unwrap();
        spawn_workers(server, Arc::new(service), 1);

        let response = send_raw(
            addr,
            "OPTIONS /sync HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        );
        assert!(response.starts_with("HTTP/1.1 204"), "{}", response);
        assert!(response.contains("Access-Control-Allow-Origin: *"));
    }
}

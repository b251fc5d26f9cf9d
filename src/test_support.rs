use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::request::{FetchOutcome, RequestDescriptor, ResponseRecord};
use crate::worker_pool::Executable;

/// Executor answering from a script indexed by how many calls it has served,
/// counted across all of its clones.
#[derive(Clone)]
pub(crate) struct ScriptedExecutor {
    served: Arc<AtomicUsize>,
    script: Arc<dyn Fn(usize) -> FetchOutcome + Send + Sync>,
}

impl ScriptedExecutor {
    pub(crate) fn new(script: impl Fn(usize) -> FetchOutcome + Send + Sync + 'static) -> Self {
        Self {
            served: Arc::new(AtomicUsize::new(0)),
            script: Arc::new(script),
        }
    }

    /// Every call succeeds with the `(status, elapsed, content_length)` the script returns.
    pub(crate) fn ok_with(
        script: impl Fn(usize) -> (u16, Duration, u64) + Send + Sync + 'static,
    ) -> Self {
        Self::new(move |n| {
            let (status, elapsed, content_length) = script(n);
            FetchOutcome::Response(ResponseRecord {
                elapsed,
                status,
                content_length,
                body: None,
            })
        })
    }

    pub(crate) fn served(&self) -> usize {
        self.served.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Executable for ScriptedExecutor {
    async fn execute(&self, _request: &RequestDescriptor) -> FetchOutcome {
        let n = self.served.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        (self.script)(n)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum MockReply {
    Respond {
        status: u16,
        body: String,
        delay: Duration,
        content_length: bool,
    },
    /// read the request, then never answer
    Hang,
    /// announce `declared` bytes of body, send `body`, then close
    Truncated { declared: usize, body: String },
}

impl MockReply {
    pub(crate) fn status(status: u16) -> Self {
        MockReply::Respond {
            status,
            body: String::new(),
            delay: Duration::ZERO,
            content_length: true,
        }
    }

    pub(crate) fn with_body(mut self, text: &str) -> Self {
        if let MockReply::Respond { body, .. } = &mut self {
            *body = text.to_owned();
        }
        self
    }

    pub(crate) fn with_delay(mut self, after: Duration) -> Self {
        if let MockReply::Respond { delay, .. } = &mut self {
            *delay = after;
        }
        self
    }

    pub(crate) fn without_content_length(mut self) -> Self {
        if let MockReply::Respond { content_length, .. } = &mut self {
            *content_length = false;
        }
        self
    }
}

pub(crate) struct MockEndpoint {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl MockEndpoint {
    pub(crate) fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub(crate) fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Minimal HTTP/1.1 endpoint on a random local port. `reply` receives the
/// arrival index of each request; every connection is closed after one answer.
pub(crate) async fn spawn_mock_endpoint<F>(reply: F) -> MockEndpoint
where
    F: Fn(usize) -> MockReply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind mock endpoint");
    let addr = listener.local_addr().expect("failed to read mock endpoint addr");
    let hits = Arc::new(AtomicUsize::new(0));
    let reply = Arc::new(reply);

    let counter = hits.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let reply = reply.clone();
            let counter = counter.clone();
            tokio::spawn(async move {
                let _ = serve(stream, reply.as_ref(), &counter).await;
            });
        }
    });
    MockEndpoint { addr, hits }
}

async fn serve<F>(mut stream: TcpStream, reply: &F, counter: &AtomicUsize) -> std::io::Result<()>
where
    F: Fn(usize) -> MockReply,
{
    let mut req = Vec::with_capacity(1024);
    loop {
        let mut chunk = [0_u8; 1024];
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            return Ok(());
        }
        req.extend_from_slice(&chunk[..read]);
        if req.windows(4).any(|bytes| bytes == b"\r\n\r\n") {
            break;
        }
    }

    match reply(counter.fetch_add(1, Ordering::SeqCst)) {
        MockReply::Hang => {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
        MockReply::Truncated { declared, body } => {
            let head = format!("HTTP/1.1 200 OK\r\nContent-Length: {declared}\r\n\r\n");
            stream.write_all(head.as_bytes()).await?;
            stream.write_all(body.as_bytes()).await?;
            stream.shutdown().await
        }
        MockReply::Respond {
            status,
            body,
            delay,
            content_length,
        } => {
            tokio::time::sleep(delay).await;
            let mut head = format!("HTTP/1.1 {status} Mock\r\nConnection: close\r\n");
            if content_length {
                head.push_str(&format!("Content-Length: {}\r\n", body.len()));
            }
            head.push_str("\r\n");
            stream.write_all(head.as_bytes()).await?;
            stream.write_all(body.as_bytes()).await?;
            stream.shutdown().await
        }
    }
}

/// An http url on a local port nothing listens on.
pub(crate) async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind throwaway listener");
    let addr = listener.local_addr().expect("failed to read throwaway addr");
    drop(listener);
    format!("http://{addr}/")
}

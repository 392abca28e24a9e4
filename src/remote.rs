//! Loopback HTTP trigger endpoint.
//!
//! A single route, `GET /replace`, lets an external process (typically a
//! build script pushing a freshly minified Lua file) drive the same
//! replace-and-save cycle as the Replace + Save buttons. The handler never
//! touches shared state itself: it posts a request carrying a reply channel
//! onto the UI thread's queue, wakes the event loop, and blocks until the
//! mutation completes, so at most one mutation is ever in flight and the
//! HTTP response reflects its outcome. Remote saves never show dialogs.

use crate::messages;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Sender, channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tiny_http::{Header, Method, Response, Server};

/// Fixed port of the trigger endpoint.
pub const REMOTE_PORT: u16 = 2345;

/// How often the serve loop re-checks the shutdown flag while idle.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How long a request waits for the UI thread before giving up.
const REPLY_TIMEOUT: Duration = Duration::from_secs(10);

/// A replace-and-save request posted to the UI thread.
///
/// The UI thread performs the mutation and answers on `reply`; an `Err`
/// carries the localized failure message a dialog would have shown, which
/// the endpoint translates before responding.
#[derive(Debug)]
pub struct RemoteRequest {
    pub reply: Sender<Result<(), String>>,
}

/// Handle to the running endpoint. Dropping it (or calling
/// [`RemoteTrigger::stop`]) asks the serve loop to exit.
pub struct RemoteTrigger {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    port: u16,
}

impl RemoteTrigger {
    /// Bind `127.0.0.1:port` and start the serve loop.
    ///
    /// `port` 0 binds an ephemeral port (used by tests); [`Self::port`]
    /// reports the actual one. `wake` is invoked after posting each request
    /// so an idle event loop drains its queue promptly.
    ///
    /// # Errors
    /// Returns an error when the socket cannot be bound (port already in
    /// use). Callers log it and run without the remote trigger.
    pub fn start<W>(
        port: u16,
        requests: Sender<RemoteRequest>,
        wake: W,
    ) -> anyhow::Result<Self>
    where
        W: Fn() + Send + 'static,
    {
        let server = Server::http(("127.0.0.1", port))
            .map_err(|e| anyhow::anyhow!("failed to bind 127.0.0.1:{port}: {e}"))?;

        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .unwrap_or(port);

        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let handle = thread::Builder::new()
            .name("remote-trigger".into())
            .spawn(move || serve_loop(server, requests, wake, flag))?;

        log::info!("Remote trigger listening on http://127.0.0.1:{port}/replace");

        Ok(Self {
            shutdown,
            handle: Some(handle),
            port,
        })
    }

    /// The port actually bound.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Stop the serve loop and wait for it to exit.
    pub fn stop(mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for RemoteTrigger {
    fn drop(&mut self) {
        // Detach rather than join: the loop notices the flag within one poll
        // interval, and process exit must not wait on a straggling request.
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

fn serve_loop<W>(
    server: Server,
    requests: Sender<RemoteRequest>,
    wake: W,
    shutdown: Arc<AtomicBool>,
) where
    W: Fn(),
{
    loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        let request = match server.recv_timeout(POLL_INTERVAL) {
            Ok(Some(request)) => request,
            Ok(None) => continue,
            // Listener disposed mid-accept; exit cleanly instead of
            // crashing the process.
            Err(e) => {
                log::info!("Remote trigger listener stopped: {e}");
                break;
            }
        };
        handle_request(request, &requests, &wake);
    }
    log::info!("Remote trigger serve loop exited");
}

fn handle_request<W>(request: tiny_http::Request, requests: &Sender<RemoteRequest>, wake: &W)
where
    W: Fn(),
{
    if *request.method() != Method::Get || request.url() != "/replace" {
        log::debug!(
            "Remote trigger: {} {} -> 404",
            request.method(),
            request.url()
        );
        let _ = request.respond(Response::empty(404));
        return;
    }

    let (reply_tx, reply_rx) = channel::<Result<(), String>>();
    let body = if requests.send(RemoteRequest { reply: reply_tx }).is_err() {
        error_body("The application is shutting down.")
    } else {
        wake();
        match reply_rx.recv_timeout(REPLY_TIMEOUT) {
            Ok(Ok(())) => success_body(),
            Ok(Err(reason)) => error_body(&messages::translate_reason(&reason)),
            Err(_) => error_body("The application did not respond in time."),
        }
    };

    let _ = request.respond(json_response(&body));
}

fn success_body() -> String {
    serde_json::json!({
        "status": "success",
        "message": messages::REMOTE_SUCCESS,
    })
    .to_string()
}

fn error_body(reason: &str) -> String {
    serde_json::json!({
        "status": "error",
        "reason": reason,
    })
    .to_string()
}

fn json_response(body: &str) -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_string(body).with_header(
        Header::from_bytes(&b"Content-Type"[..], &b"text/plain; charset=utf-8"[..]).unwrap(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_body_shape() {
        let body = success_body();
        assert_eq!(
            body,
            "{\"message\":\"Files updated successfully.\",\"status\":\"success\"}"
        );
    }

    #[test]
    fn test_error_body_shape() {
        let body = error_body("No script is selected for replacement.");
        assert!(body.contains("\"status\":\"error\""));
        assert!(body.contains("\"reason\":\"No script is selected for replacement.\""));
    }
}

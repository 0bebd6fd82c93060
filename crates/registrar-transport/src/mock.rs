//! Scripted in-memory transport for tests.
//!
//! Replies are queued per `(method, path)`. Each call pops the front of the
//! queue, except that the last reply stays in place and repeats, so
//! "401 once, then 200 forever" is two lines of setup. Calls are recorded
//! in arrival order.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::{ApiRequest, ApiResponse, HttpTransport, Method, TransportError};

/// What the mock does for one call.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this response.
    Respond(ApiResponse),
    /// Fail as if the server were unreachable.
    Unreachable,
}

/// One request the mock has seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub request: ApiRequest,
}

#[derive(Default)]
struct Route {
    replies: VecDeque<MockReply>,
    delay: Option<Duration>,
}

#[derive(Default)]
struct MockInner {
    routes: Mutex<HashMap<(Method, String), Route>>,
    calls: Mutex<Vec<RecordedCall>>,
}

/// An [`HttpTransport`] that answers from a script.
///
/// Clones share the same script and call log, so a test can keep one clone
/// for assertions and hand another to the code under test.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<MockInner>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response with `status` and `body` for `method path`.
    pub fn respond(
        &self,
        method: Method,
        path: &str,
        status: u16,
        body: impl Into<Vec<u8>>,
    ) -> &Self {
        self.push(
            method,
            path,
            MockReply::Respond(ApiResponse::new(status, body)),
        )
    }

    /// Queues a transport failure for `method path`.
    pub fn fail(&self, method: Method, path: &str) -> &Self {
        self.push(method, path, MockReply::Unreachable)
    }

    /// Makes every call to `method path` wait `delay` before answering.
    pub fn delay(&self, method: Method, path: &str, delay: Duration) -> &Self {
        self.routes()
            .entry((method, path.to_string()))
            .or_default()
            .delay = Some(delay);
        self
    }

    /// Queues an arbitrary reply.
    pub fn push(&self, method: Method, path: &str, reply: MockReply) -> &Self {
        self.routes()
            .entry((method, path.to_string()))
            .or_default()
            .replies
            .push_back(reply);
        self
    }

    /// Forgets the replies and delay scripted for `method path`.
    ///
    /// The call log is kept, so counts keep accumulating across a reset.
    pub fn reset(&self, method: Method, path: &str) -> &Self {
        self.routes().remove(&(method, path.to_string()));
        self
    }

    /// Number of calls made to `method path` so far.
    pub fn calls(&self, method: Method, path: &str) -> usize {
        self.log()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }

    /// Number of calls made to any route.
    pub fn total_calls(&self) -> usize {
        self.log().len()
    }

    /// Every call so far, in arrival order.
    pub fn recorded(&self) -> Vec<RecordedCall> {
        self.log().clone()
    }

    fn routes(&self) -> MutexGuard<'_, HashMap<(Method, String), Route>> {
        // A panic in another test thread must not cascade into this one.
        self.inner
            .routes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn log(&self) -> MutexGuard<'_, Vec<RecordedCall>> {
        self.inner
            .calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_reply(
        &self,
        method: Method,
        path: &str,
    ) -> (Option<MockReply>, Option<Duration>) {
        let mut routes = self.routes();
        match routes.get_mut(&(method, path.to_string())) {
            Some(route) => {
                let reply = if route.replies.len() > 1 {
                    route.replies.pop_front()
                } else {
                    route.replies.front().cloned()
                };
                (reply, route.delay)
            }
            None => (None, None),
        }
    }
}

impl HttpTransport for MockTransport {
    async fn send(
        &self,
        request: &ApiRequest,
    ) -> Result<ApiResponse, TransportError> {
        let method = request.method();
        let path = request.path().to_string();

        self.log().push(RecordedCall {
            method,
            path: path.clone(),
            request: request.clone(),
        });
        let (reply, delay) = self.next_reply(method, &path);

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match reply {
            Some(MockReply::Respond(response)) => Ok(response),
            Some(MockReply::Unreachable) => Err(TransportError::request_failed(
                format!("mock://{path}"),
                std::io::ErrorKind::ConnectionRefused,
                "mock route configured to fail",
            )),
            None => Ok(ApiResponse::new(
                404,
                format!(r#"{{"error":"no mock route for {method} {path}"}}"#),
            )),
        }
    }
}

use std::cell::RefCell;
use std::fmt;

use crate::catalog::EndpointFilter;
use crate::transport::{Request, Response, Session, Transport, TransportError};

type Reply = Box<dyn Fn(&Request) -> Result<Response, TransportError>>;

/// In-memory [`Session`] returning canned replies and recording requests.
pub(crate) struct FakeSession {
    endpoint: Option<String>,
    reply: Reply,
    sent: RefCell<Vec<Request>>,
}

impl FakeSession {
    pub(crate) fn replying(response: Response) -> Self {
        Self {
            endpoint: None,
            reply: Box::new(move |_| Ok(response.clone())),
            sent: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn failing(error: fn() -> TransportError) -> Self {
        Self {
            endpoint: None,
            reply: Box::new(move |_| Err(error())),
            sent: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = Some(endpoint.to_owned());
        self
    }

    pub(crate) fn sent(&self) -> Vec<Request> {
        self.sent.borrow().clone()
    }
}

impl fmt::Debug for FakeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeSession")
            .field("endpoint", &self.endpoint)
            .field("sent", &self.sent)
            .finish_non_exhaustive()
    }
}

impl Transport for FakeSession {
    fn send(&self, request: Request) -> Result<Response, TransportError> {
        let reply = (self.reply)(&request);
        self.sent.borrow_mut().push(request);
        reply
    }
}

impl Session for FakeSession {
    fn get_endpoint(&self, _filter: &EndpointFilter) -> Result<Option<String>, TransportError> {
        Ok(self.endpoint.clone())
    }
}

/// Counts captured log lines containing `needle`.
pub(crate) fn count_lines(lines: &[&str], needle: &str) -> usize {
    lines.iter().filter(|line| line.contains(needle)).count()
}

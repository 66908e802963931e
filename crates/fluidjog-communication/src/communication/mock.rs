//! In-memory transport
//!
//! Simulates a controller on the other end of the wire: tests queue inbound
//! bytes directly or register replies that are released when a matching line
//! is written. Lets the protocol layer be exercised without hardware.

use super::Transport;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

#[derive(Debug)]
struct ReplyRule {
    prefix: String,
    reply: Vec<u8>,
    remaining: Option<usize>,
}

#[derive(Debug, Default)]
struct MockState {
    inbound: VecDeque<u8>,
    writes: Vec<String>,
    rules: Vec<ReplyRule>,
    closed: bool,
    close_calls: usize,
}

/// Transport backed by shared in-memory buffers
#[derive(Debug)]
pub struct MockTransport {
    name: String,
    state: Arc<Mutex<MockState>>,
}

/// Test-side view of a [`MockTransport`]
#[derive(Debug, Clone)]
pub struct MockTransportHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a transport and the handle that drives it
    pub fn new(name: impl Into<String>) -> (Self, MockTransportHandle) {
        let state = Arc::new(Mutex::new(MockState::default()));
        (
            Self {
                name: name.into(),
                state: state.clone(),
            },
            MockTransportHandle { state },
        )
    }
}

impl MockTransportHandle {
    /// Queue bytes for the next reads
    pub fn push_inbound(&self, bytes: &[u8]) {
        self.state.lock().inbound.extend(bytes.iter().copied());
    }

    /// Queue one line (a newline is appended)
    pub fn push_line(&self, line: &str) {
        let mut state = self.state.lock();
        state.inbound.extend(line.bytes());
        state.inbound.push_back(b'\n');
    }

    /// Reply with `reply` every time a write starts with `prefix`
    pub fn reply_always(&self, prefix: &str, reply: &str) {
        self.add_rule(prefix, reply, None);
    }

    /// Reply with `reply` to the next `times` writes starting with `prefix`
    pub fn reply_times(&self, prefix: &str, reply: &str, times: usize) {
        self.add_rule(prefix, reply, Some(times));
    }

    fn add_rule(&self, prefix: &str, reply: &str, remaining: Option<usize>) {
        self.state.lock().rules.push(ReplyRule {
            prefix: prefix.to_string(),
            reply: reply.as_bytes().to_vec(),
            remaining,
        });
    }

    /// Every write so far, decoded, in order
    pub fn writes(&self) -> Vec<String> {
        self.state.lock().writes.clone()
    }

    /// Writes whose text starts with `prefix`
    pub fn writes_starting_with(&self, prefix: &str) -> Vec<String> {
        self.state
            .lock()
            .writes
            .iter()
            .filter(|w| w.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Whether the transport has been closed
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Number of `close` calls seen
    pub fn close_calls(&self) -> usize {
        self.state.lock().close_calls
    }
}

impl Transport for MockTransport {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "mock closed"));
        }
        let text = String::from_utf8_lossy(data).into_owned();

        // First live rule wins, so limited rules can sit in front of a fallback
        let reply = state
            .rules
            .iter_mut()
            .find(|rule| rule.remaining != Some(0) && text.starts_with(&rule.prefix))
            .map(|rule| {
                if let Some(n) = rule.remaining.as_mut() {
                    *n -= 1;
                }
                rule.reply.clone()
            });
        if let Some(reply) = reply {
            state.inbound.extend(reply);
        }

        state.writes.push(text);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "mock closed"));
        }
        let n = buf.len().min(state.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(state.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn close(&mut self) -> io::Result<()> {
        let mut state = self.state.lock();
        state.closed = true;
        state.close_calls += 1;
        Ok(())
    }
}

//! Scripted in-memory transport for tests.
//!
//! # Why a scripted transport?
//!
//! Real transports need a display on a serial port or USB bus.  The
//! [`ScriptedTransport`] replaces the device with a queue of input events
//! and a log of written packets, so protocol behaviour can be exercised
//! byte for byte without hardware.
//!
//! The transport is moved into the connection under test, so the script is
//! shared through a [`ScriptHandle`] (an `Arc<Mutex<..>>`) that the test keeps.
//!
//! # Usage in tests
//!
//! ```ignore
//! let (transport, script) = ScriptedTransport::new(TransportKind::Serial);
//! script.reply_to(&IDENTIFY_REQUEST, &[0x1B, b'I', b'D', b'=', 0x03]);
//!
//! let connection = Connection::connect(Box::new(transport), params)?;
//! assert_eq!(connection.model().name, "ABT 380");
//! assert_eq!(script.written()[0], IDENTIFY_REQUEST);
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{serial_write_delay, Transport, TransportError, TransportKind};

/// One scripted input event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptEvent {
    /// Bytes that become readable.
    Bytes(Vec<u8>),
    /// One idle poll: the next read or await reports no data.
    Idle,
    /// The device disappears; every later call fails.
    Lost,
}

#[derive(Debug, Default)]
struct Script {
    input: VecDeque<ScriptEvent>,
    written: Vec<Vec<u8>>,
    replies: Vec<(Vec<u8>, Vec<u8>)>,
    feature_reports: HashMap<u8, Vec<u8>>,
    resets: usize,
    closed: bool,
    fail_writes: bool,
}

/// Test-side view of a [`ScriptedTransport`].
#[derive(Debug, Clone, Default)]
pub struct ScriptHandle(Arc<Mutex<Script>>);

impl ScriptHandle {
    fn lock(&self) -> MutexGuard<'_, Script> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues bytes for reading.
    pub fn push_bytes(&self, bytes: &[u8]) {
        self.lock().input.push_back(ScriptEvent::Bytes(bytes.to_vec()));
    }

    /// Queues one idle poll.
    pub fn push_idle(&self) {
        self.lock().input.push_back(ScriptEvent::Idle);
    }

    /// Queues a disconnect.
    pub fn push_lost(&self) {
        self.lock().input.push_back(ScriptEvent::Lost);
    }

    /// Whenever exactly `request` is written, queue `reply` for reading.
    pub fn reply_to(&self, request: &[u8], reply: &[u8]) {
        self.lock().replies.push((request.to_vec(), reply.to_vec()));
    }

    /// Makes HID feature report `report` return `contents`.
    pub fn set_feature_report(&self, report: u8, contents: &[u8]) {
        self.lock().feature_reports.insert(report, contents.to_vec());
    }

    /// Makes every write fail as if the device vanished.
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Every packet written so far, oldest first.
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.lock().written.clone()
    }

    /// Forgets the written packets.
    pub fn clear_written(&self) {
        self.lock().written.clear();
    }

    pub fn resets(&self) -> usize {
        self.lock().resets
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of input events not yet consumed.
    pub fn pending_input(&self) -> usize {
        self.lock().input.len()
    }
}

/// A transport driven entirely by a [`ScriptHandle`].
#[derive(Debug)]
pub struct ScriptedTransport {
    kind: TransportKind,
    script: ScriptHandle,
}

impl ScriptedTransport {
    /// Serial links at 9600 baud move 960 characters per second.
    pub const SERIAL_CHARS_PER_SECOND: u32 = 960;

    /// Creates a transport of `kind` and the handle that scripts it.
    pub fn new(kind: TransportKind) -> (Self, ScriptHandle) {
        let script = ScriptHandle::default();
        (Self { kind, script: script.clone() }, script)
    }
}

fn lost(reason: &str) -> TransportError {
    TransportError::lost(reason.to_string())
}

impl Transport for ScriptedTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        let mut script = self.script.lock();
        if script.closed {
            return Err(lost("closed"));
        }
        script.resets += 1;
        Ok(())
    }

    fn close(&mut self) {
        self.script.lock().closed = true;
    }

    fn await_input(&mut self, _timeout: Duration) -> Result<bool, TransportError> {
        let mut script = self.script.lock();
        if script.closed {
            return Err(lost("closed"));
        }
        match script.input.front() {
            Some(ScriptEvent::Bytes(_)) => Ok(true),
            Some(ScriptEvent::Idle) => {
                script.input.pop_front();
                Ok(false)
            }
            Some(ScriptEvent::Lost) => Err(lost("device unplugged")),
            None => Ok(false),
        }
    }

    fn read_bytes(&mut self, buffer: &mut [u8], _wait: bool) -> Result<usize, TransportError> {
        let mut script = self.script.lock();
        if script.closed {
            return Err(lost("closed"));
        }
        while let Some(event) = script.input.pop_front() {
            match event {
                ScriptEvent::Bytes(mut bytes) => {
                    if bytes.is_empty() {
                        continue;
                    }
                    let count = bytes.len().min(buffer.len());
                    buffer[..count].copy_from_slice(&bytes[..count]);
                    bytes.drain(..count);
                    if !bytes.is_empty() {
                        script.input.push_front(ScriptEvent::Bytes(bytes));
                    }
                    return Ok(count);
                }
                ScriptEvent::Idle => return Ok(0),
                ScriptEvent::Lost => {
                    script.input.push_front(ScriptEvent::Lost);
                    return Err(lost("device unplugged"));
                }
            }
        }
        Ok(0)
    }

    fn write_packet(&mut self, bytes: &[u8], delay: &mut Duration) -> Result<usize, TransportError> {
        let mut script = self.script.lock();
        if script.closed || script.fail_writes {
            return Err(lost("write failed"));
        }
        script.written.push(bytes.to_vec());

        let replies: Vec<Vec<u8>> = script
            .replies
            .iter()
            .filter(|(request, _)| request.as_slice() == bytes)
            .map(|(_, reply)| reply.clone())
            .collect();
        for reply in replies {
            script.input.push_back(ScriptEvent::Bytes(reply));
        }

        if self.kind == TransportKind::Serial {
            *delay += serial_write_delay(bytes.len(), Self::SERIAL_CHARS_PER_SECOND);
        }
        Ok(bytes.len())
    }

    fn get_feature_report(&mut self, report: u8, buffer: &mut [u8]) -> Result<usize, TransportError> {
        if self.kind != TransportKind::UsbHid {
            return Err(TransportError::NotSupported);
        }
        let script = self.script.lock();
        let contents = script
            .feature_reports
            .get(&report)
            .ok_or_else(|| lost("feature report unavailable"))?;
        let count = contents.len().min(buffer.len());
        buffer[..count].copy_from_slice(&contents[..count]);
        Ok(count)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

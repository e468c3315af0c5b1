//! Serial console reader.
//!
//! A background thread blocks on stdin (UART0 on the ESP32, the terminal
//! on the host) and hands complete lines to the control loop through a
//! bounded `embassy-sync` channel.  The loop polls with
//! [`Console::try_recv_line`] so a slow operator never stalls a tick.
//!
//! ```text
//! ┌──────────────┐  ConsoleLine  ┌──────────────┐
//! │ Reader thread│──────────────▶│ Control loop │
//! │ (blocking)   │  try_send     │ try_receive  │
//! └──────────────┘               └──────────────┘
//! ```
//!
//! The reader never exits on bad input: invalid UTF-8 is replaced, long
//! lines are cut at a character boundary and read errors are retried.
//! The emergency stop travels over this path.

use std::io::{BufRead, ErrorKind, Read};
use std::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{info, warn};

/// Longest line forwarded, in bytes; anything past this is dropped.
pub const MAX_LINE_LEN: usize = 128;

/// Lines buffered between reader and loop before new ones are dropped.
pub const CONSOLE_DEPTH: usize = 8;

/// Raw bytes read per segment before a line counts as overlong.
const RAW_LIMIT: usize = MAX_LINE_LEN * 2;

/// Back-off after a failed or empty non-blocking read.
const READ_RETRY: Duration = Duration::from_millis(20);

pub type ConsoleLine = heapless::String<MAX_LINE_LEN>;

pub type LineChannel = Channel<CriticalSectionRawMutex, ConsoleLine, CONSOLE_DEPTH>;

/// Reader thread → control loop.
pub static CONSOLE_CHANNEL: LineChannel = Channel::new();

pub struct Console<'a> {
    channel: &'a LineChannel,
}

impl Console<'static> {
    /// Spawn the stdin reader thread feeding [`CONSOLE_CHANNEL`].
    pub fn spawn() -> std::io::Result<Self> {
        std::thread::Builder::new()
            .name("console".into())
            .stack_size(4096)
            .spawn(|| {
                pump_lines(std::io::stdin().lock(), &CONSOLE_CHANNEL);
                info!("console: reader exiting");
            })?;
        Ok(Self::new(&CONSOLE_CHANNEL))
    }
}

impl<'a> Console<'a> {
    pub fn new(channel: &'a LineChannel) -> Self {
        Self { channel }
    }

    /// Next pending line, if any.  Never blocks.
    pub fn try_recv_line(&self) -> Option<ConsoleLine> {
        self.channel.try_receive().ok()
    }
}

/// Read `reader` to EOF, forwarding one [`ConsoleLine`] per input line.
///
/// A line longer than the raw segment limit is forwarded once, cut down,
/// and the rest of it is discarded up to the next newline.
pub fn pump_lines<R: BufRead>(mut reader: R, channel: &LineChannel) {
    let mut raw: Vec<u8> = Vec::with_capacity(RAW_LIMIT);
    let mut discarding = false;
    let mut read_failed = false;

    loop {
        let room = RAW_LIMIT.saturating_sub(raw.len()) as u64;
        match (&mut reader).take(room).read_until(b'\n', &mut raw) {
            Ok(0) => {
                if !raw.is_empty() && !discarding {
                    forward(&raw, channel);
                }
                break;
            }
            Ok(_) => {
                read_failed = false;
                let complete = raw.last() == Some(&b'\n');
                if !discarding {
                    forward(&raw, channel);
                }
                discarding = !complete && raw.len() >= RAW_LIMIT;
                raw.clear();
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) if e.kind() == ErrorKind::WouldBlock => std::thread::sleep(READ_RETRY),
            Err(e) => {
                if !read_failed {
                    warn!("console: read error ({}), retrying", e);
                    read_failed = true;
                }
                std::thread::sleep(READ_RETRY);
            }
        }
    }
}

fn forward(raw: &[u8], channel: &LineChannel) {
    if channel.try_send(decode_line(raw)).is_err() {
        warn!("console: queue full, line dropped");
    }
}

/// Lossy UTF-8 decode without the line terminator, cut to
/// [`MAX_LINE_LEN`] bytes on a character boundary.
pub fn decode_line(raw: &[u8]) -> ConsoleLine {
    let text = String::from_utf8_lossy(raw);
    let mut line = ConsoleLine::new();
    for c in text.trim_end_matches(['\r', '\n']).chars() {
        if line.push(c).is_err() {
            break;
        }
    }
    line
}

//! Best-effort decoding of laser rangefinder output.
//!
//! Two device flavours are understood: text sent over a serial/RFCOMM port
//! (the first number in the response, in metres) and 4-byte little-endian
//! `f32` metre values as delivered by Bluetooth LE notifications. Either way
//! the reading ends up as an integer millimetre string handed to
//! [`Session::submit_measurement`](crate::session::Session::submit_measurement),
//! exactly as if it had been typed.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use clap::ValueEnum;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Plausible range for a line, in metres.
pub const MIN_METRES: f64 = 0.01;
pub const MAX_METRES: f64 = 100.0;

const RFCOMM_CANDIDATES: usize = 10;
const NOTIFICATION_LEN: usize = 4;

/// How a feed source encodes its readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, strum_macros::Display)]
pub enum FeedFormat {
    /// Text responses, one per line.
    #[default]
    #[strum(to_string = "text")]
    Text,
    /// Raw 4-byte notification frames.
    #[strum(to_string = "notify")]
    Notify,
}

fn plausible(metres: f64) -> bool {
    (MIN_METRES..=MAX_METRES).contains(&metres)
}

/// Extracts a distance from a free-form serial response.
#[derive(Debug, Clone)]
pub struct ReadingParser {
    decimal: Regex,
    integer: Regex,
}

impl Default for ReadingParser {
    fn default() -> Self {
        Self {
            decimal: Regex::new(r"(\d+\.\d+)").expect("Invalid regex pattern"),
            integer: Regex::new(r"(\d+)").expect("Invalid regex pattern"),
        }
    }
}

impl ReadingParser {
    /// First decimal number in range, else first integer in range.
    pub fn parse(&self, response: &str) -> Option<f64> {
        [&self.decimal, &self.integer].into_iter().find_map(|re| {
            re.captures(response)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .filter(|d| plausible(*d))
        })
    }
}

/// Decode one notification payload: a little-endian `f32` in metres.
pub fn decode_notification(payload: &[u8]) -> Option<f64> {
    let bytes: [u8; 4] = payload.try_into().ok()?;
    let metres = f32::from_le_bytes(bytes);
    metres.is_finite().then_some(f64::from(metres))
}

/// What gets typed for a reading: whole millimetres.
pub fn metres_to_entry(metres: f64) -> String {
    format!("{}", (metres * 1000.0).round() as i64)
}

/// Existing `rfcomm0..9` device nodes under `dev`.
pub fn candidate_ports_in(dev: &Path) -> Vec<PathBuf> {
    (0..RFCOMM_CANDIDATES)
        .map(|i| dev.join(format!("rfcomm{i}")))
        .filter(|p| p.exists())
        .collect()
}

pub fn candidate_ports() -> Vec<PathBuf> {
    candidate_ports_in(Path::new("/dev"))
}

/// Iterator of millimetre entries read line by line from a source.
/// Lines without a plausible distance are skipped.
pub struct FeedReader<R> {
    reader: R,
    parser: ReadingParser,
    buf: String,
}

impl<R: BufRead> FeedReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            parser: ReadingParser::default(),
            buf: String::new(),
        }
    }
}

impl<R: BufRead> Iterator for FeedReader<R> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {
                    if let Some(metres) = self.parser.parse(&self.buf) {
                        return Some(metres_to_entry(metres));
                    }
                    debug!(
                        response = self.buf.trim(),
                        "no distance in rangefinder response"
                    );
                }
                Err(e) => {
                    warn!(error = %e, "rangefinder read failed");
                    return None;
                }
            }
        }
    }
}

/// Iterator of millimetre entries from a stream of notification frames.
/// Frames that do not hold a plausible distance are skipped; a trailing
/// partial frame ends the stream.
pub struct NotificationReader<R> {
    reader: R,
}

impl<R: Read> NotificationReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: Read> Iterator for NotificationReader<R> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let mut frame = [0u8; NOTIFICATION_LEN];
        loop {
            match self.reader.read_exact(&mut frame) {
                Ok(()) => match decode_notification(&frame).filter(|m| plausible(*m)) {
                    Some(metres) => return Some(metres_to_entry(metres)),
                    None => debug!(?frame, "no distance in notification"),
                },
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => return None,
                Err(e) => {
                    warn!(error = %e, "rangefinder read failed");
                    return None;
                }
            }
        }
    }
}

/// Entries from `file`, decoded according to `format`.
fn entries(file: File, format: FeedFormat) -> Box<dyn Iterator<Item = String> + Send> {
    match format {
        FeedFormat::Text => Box::new(FeedReader::new(BufReader::new(file))),
        FeedFormat::Notify => Box::new(NotificationReader::new(BufReader::new(file))),
    }
}

/// Open `path` (serial device, FIFO or plain file) and forward every reading
/// to `on_entry` from a background thread until the source ends or
/// `on_entry` returns false. The device is opened before this returns so
/// errors surface to the caller; it is closed when the thread exits.
pub fn spawn_feed<F>(path: &Path, format: FeedFormat, mut on_entry: F) -> Result<JoinHandle<()>>
where
    F: FnMut(String) -> bool + Send + 'static,
{
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let source = path.display().to_string();
    info!(source = %source, %format, "rangefinder feed opened");

    Ok(thread::spawn(move || {
        for entry in entries(file, format) {
            if !on_entry(entry) {
                break;
            }
        }
        info!(source = %source, "rangefinder feed closed");
    }))
}

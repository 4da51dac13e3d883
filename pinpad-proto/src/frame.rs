//! Length-prefixed text framing.
//!
//! Each frame is: `['#'][4 ASCII digits: total length][payload]`, where the
//! total length includes the 5 header bytes.

use std::borrow::Cow;
use std::time::{Duration, Instant};

use bytes::{Buf, BytesMut};
use tracing::{debug, trace};

/// Frame start sentinel.
pub const START: u8 = b'#';

/// Sentinel plus the 4-digit length field.
pub const HEADER_LEN: usize = 5;

/// Largest total frame length expressible in the length field.
pub const MAX_FRAME: usize = 9999;

/// Idle gap after which a buffered partial frame is considered stale.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_millis(5000);

/// Acknowledgement sent back to the terminal for every receipt.
pub const RECEIPT_ACK: &str = "#00073 ";

/// Errors produced while framing outbound messages.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FrameError {
    /// Payload does not fit in the 4-digit length field.
    #[error("payload of {len} bytes does not fit in a frame")]
    TooLong {
        /// Payload length in bytes.
        len: usize,
    },
}

/// Wraps `payload` in a frame header.
pub fn frame(payload: &str) -> Result<String, FrameError> {
    let total = payload.len() + HEADER_LEN;
    if total > MAX_FRAME {
        return Err(FrameError::TooLong { len: payload.len() });
    }
    Ok(format!("#{total:04}{payload}"))
}

/// Incremental frame extractor for an inbound byte stream.
///
/// Feed every received fragment to [`Framer::extend`], then drain complete
/// payloads with [`Framer::next_frame`] until it yields `None`.
///
/// Between calls the buffer holds either nothing or the beginning of one
/// frame that is not yet complete. Bytes preceding a start sentinel are
/// discarded, and a header whose length field is malformed is skipped one
/// byte at a time until the stream resynchronises.
#[derive(Debug)]
pub struct Framer {
    /// Unconsumed bytes.
    buf: BytesMut,
    /// Arrival time of the previous fragment.
    last_rx: Option<Instant>,
    /// Idle gap that invalidates buffered data.
    stale_after: Duration,
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}

impl Framer {
    /// Creates a framer using [`DEFAULT_STALE_AFTER`].
    pub fn new() -> Self {
        Self::with_stale_after(DEFAULT_STALE_AFTER)
    }

    /// Creates a framer with a custom staleness window.
    pub fn with_stale_after(stale_after: Duration) -> Self {
        Self {
            buf: BytesMut::new(),
            last_rx: None,
            stale_after,
        }
    }

    /// Bytes currently buffered.
    pub fn buffered(&self) -> &[u8] {
        &self.buf
    }

    /// Drops all buffered data and forgets the last arrival time.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.last_rx = None;
    }

    /// Appends a received fragment that arrived at `now`.
    ///
    /// If more than the staleness window elapsed since the previous
    /// fragment, whatever was buffered is discarded first.
    pub fn extend(&mut self, fragment: &[u8], now: Instant) {
        if let Some(prev) = self.last_rx
            && now.saturating_duration_since(prev) > self.stale_after
            && !self.buf.is_empty()
        {
            debug!(discarded = self.buf.len(), "discarding stale partial frame");
            self.buf.clear();
        }
        self.last_rx = Some(now);
        self.buf.extend_from_slice(fragment);
    }

    /// Extracts the next complete payload, if one is buffered.
    ///
    /// Bytes that are not valid UTF-8 are replaced with U+FFFD; the frame
    /// and everything after it are kept.
    pub fn next_frame(&mut self) -> Option<String> {
        loop {
            let Some(start) = self.buf.iter().position(|&b| b == START) else {
                if !self.buf.is_empty() {
                    trace!(skipped = self.buf.len(), "discarding bytes outside a frame");
                    self.buf.clear();
                }
                return None;
            };
            self.buf.advance(start);

            if self.buf.len() < HEADER_LEN {
                return None;
            }

            let Some(len) = parse_len(&self.buf[1..HEADER_LEN]) else {
                debug!("invalid frame length field, resynchronising");
                self.buf.advance(1);
                continue;
            };

            if self.buf.len() < len {
                return None;
            }

            let raw = self.buf.split_to(len);
            let payload = String::from_utf8_lossy(&raw[HEADER_LEN..]);
            if matches!(payload, Cow::Owned(_)) {
                debug!(len, "frame payload is not valid UTF-8, decoding lossily");
            }
            return Some(payload.into_owned());
        }
    }
}

/// Parses the 4-digit length field; lengths that leave no payload are invalid.
fn parse_len(digits: &[u8]) -> Option<usize> {
    if !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let len = digits
        .iter()
        .fold(0usize, |acc, d| acc * 10 + usize::from(d - b'0'));
    (len > HEADER_LEN).then_some(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(framer: &mut Framer) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(p) = framer.next_frame() {
            out.push(p);
        }
        out
    }

    #[test]
    fn frame_counts_header_in_length() {
        assert_eq!(frame("3 ").unwrap(), RECEIPT_ACK);
        assert_eq!(frame("hello").unwrap(), "#0010hello");
    }

    #[test]
    fn frame_rejects_oversized_payload() {
        let payload = "x".repeat(MAX_FRAME);
        assert!(matches!(frame(&payload), Err(FrameError::TooLong { .. })));
    }

    #[test]
    fn single_fragment_yields_payload() {
        let payload = "A".repeat(24);
        let mut framer = Framer::new();
        framer.extend(format!("#0029{payload}").as_bytes(), Instant::now());

        assert_eq!(drain(&mut framer), vec![payload]);
        assert!(framer.buffered().is_empty());
    }

    #[test]
    fn split_header_waits_for_more() {
        let mut framer = Framer::new();
        let now = Instant::now();

        framer.extend(b"#0031AB", now);
        assert!(drain(&mut framer).is_empty());
        assert_eq!(framer.buffered(), b"#0031AB");

        let rest = "C".repeat(24);
        framer.extend(rest.as_bytes(), now);
        assert_eq!(drain(&mut framer), vec![format!("AB{rest}")]);
        assert!(framer.buffered().is_empty());
    }

    #[test]
    fn every_split_point_gives_same_payloads() {
        let wire = format!("{}{}", frame("first message").unwrap(), frame("second").unwrap());
        let bytes = wire.as_bytes();

        for split in 1..bytes.len() {
            let mut framer = Framer::new();
            let now = Instant::now();
            let mut got = Vec::new();
            framer.extend(&bytes[..split], now);
            got.extend(drain(&mut framer));
            framer.extend(&bytes[split..], now);
            got.extend(drain(&mut framer));
            assert_eq!(got, vec!["first message", "second"], "split at {split}");
        }
    }

    #[test]
    fn byte_at_a_time_delivery() {
        let wire = frame("one byte at a time").unwrap();
        let mut framer = Framer::new();
        let now = Instant::now();
        let mut got = Vec::new();
        for b in wire.as_bytes() {
            framer.extend(std::slice::from_ref(b), now);
            got.extend(drain(&mut framer));
        }
        assert_eq!(got, vec!["one byte at a time"]);
    }

    #[test]
    fn short_or_non_numeric_length_resyncs() {
        let mut framer = Framer::new();
        framer.extend(b"#0005#00x9", Instant::now());
        assert!(drain(&mut framer).is_empty());
        assert!(framer.buffered().is_empty());

        let mut framer = Framer::new();
        let wire = format!("#0003{}", frame("ok").unwrap());
        framer.extend(wire.as_bytes(), Instant::now());
        assert_eq!(drain(&mut framer), vec!["ok"]);
    }

    #[test]
    fn garbage_before_sentinel_is_skipped() {
        let mut framer = Framer::new();
        let wire = format!("noise{}", frame("payload").unwrap());
        framer.extend(wire.as_bytes(), Instant::now());
        assert_eq!(drain(&mut framer), vec!["payload"]);
    }

    #[test]
    fn stale_partial_frame_is_discarded() {
        let mut framer = Framer::new();
        let t0 = Instant::now();
        framer.extend(b"#0020stale", t0);
        assert!(drain(&mut framer).is_empty());

        framer.extend(
            frame("fresh").unwrap().as_bytes(),
            t0 + DEFAULT_STALE_AFTER + Duration::from_millis(1),
        );
        assert_eq!(drain(&mut framer), vec!["fresh"]);
    }

    #[test]
    fn gap_within_window_keeps_partial_frame() {
        let mut framer = Framer::new();
        let t0 = Instant::now();
        framer.extend(b"#0010hel", t0);
        framer.extend(b"lo", t0 + Duration::from_millis(4000));
        assert_eq!(drain(&mut framer), vec!["hello"]);
    }

    #[test]
    fn non_utf8_payload_keeps_following_frames() {
        let mut framer = Framer::new();
        let mut wire = b"#0010caf\xe9!".to_vec();
        wire.extend_from_slice(frame("next").unwrap().as_bytes());
        framer.extend(&wire, Instant::now());

        assert_eq!(drain(&mut framer), vec!["caf\u{fffd}!", "next"]);
        assert!(framer.buffered().is_empty());
    }
}

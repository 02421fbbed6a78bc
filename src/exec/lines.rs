// src/exec/lines.rs

//! Line-oriented decoding of a child's output stream.

use std::fmt;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{trace, warn};

/// Callback receiving one decoded line, without its terminator.
pub type LineObserver = Box<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Stdout => f.write_str("stdout"),
            StreamKind::Stderr => f.write_str("stderr"),
        }
    }
}

/// Read `reader` to EOF, handing each line to `observer` in order.
///
/// - Lines are split on `\n`; a trailing `\r` is stripped.
/// - A final fragment without a newline is still delivered.
/// - Invalid UTF-8 is decoded lossily.
/// - Without an observer the stream is still drained so the child never
///   blocks on a full pipe.
///
/// A read error ends the pump early; it is logged, never propagated.
/// Returns the number of lines read.
pub async fn pump_lines<R>(
    reader: R,
    observer: Option<&(dyn Fn(&str) + Send + Sync)>,
    stream: StreamKind,
) -> usize
where
    R: AsyncRead + Unpin,
{
    let mut segments = BufReader::new(reader).split(b'\n');
    let mut count = 0;

    loop {
        match segments.next_segment().await {
            Ok(Some(mut bytes)) => {
                if bytes.last() == Some(&b'\r') {
                    bytes.pop();
                }
                let line = String::from_utf8_lossy(&bytes);
                match observer {
                    Some(observer) => observer(&*line),
                    None => trace!(%stream, "{}", line),
                }
                count += 1;
            }
            Ok(None) => break,
            Err(e) => {
                warn!(%stream, error = %e, "reading process output failed; stopping");
                break;
            }
        }
    }

    count
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    async fn collect(input: &'static [u8]) -> Vec<String> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer = move |line: &str| sink.lock().unwrap().push(line.to_string());

        let n = pump_lines(input, Some(&observer), StreamKind::Stdout).await;

        let lines = seen.lock().unwrap().clone();
        assert_eq!(n, lines.len());
        lines
    }

    #[tokio::test]
    async fn delivers_final_line_without_newline() {
        assert_eq!(collect(b"a\nb\nc").await, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn keeps_empty_lines_and_inner_whitespace() {
        assert_eq!(
            collect(b"  lead\n\ntrail  \n").await,
            vec!["  lead", "", "trail  "]
        );
    }

    #[tokio::test]
    async fn strips_crlf_terminator() {
        assert_eq!(collect(b"one\r\ntwo\r\n").await, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn empty_stream_yields_nothing() {
        assert!(collect(b"").await.is_empty());
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced() {
        assert_eq!(collect(b"ok\n\xff\n").await, vec!["ok", "\u{FFFD}"]);
    }

    #[tokio::test]
    async fn drains_without_observer() {
        assert_eq!(pump_lines(&b"x\ny\n"[..], None, StreamKind::Stderr).await, 2);
    }
}

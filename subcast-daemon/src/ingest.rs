//! Newline-delimited JSON input
//!
//! Lets the daemon be fed by any upstream process: each line is one
//! [`TranslationResult`] encoded as JSON.

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::result::TranslationResult;

/// Forward results read from `reader` into the input queue
///
/// Blank lines are skipped and malformed lines are logged and skipped.
/// Returns the number of results forwarded once the reader hits EOF or the
/// queue's consumer has gone away.
pub async fn forward_json_lines<R>(
    mut reader: R,
    queue: mpsc::UnboundedSender<TranslationResult>,
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    // Raw bytes so a line that is not UTF-8 is skipped like any other bad line
    let mut line = Vec::new();
    let mut line_number = 0;
    let mut forwarded = 0;

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }
        line_number += 1;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let result: TranslationResult = match serde_json::from_slice(&line) {
            Ok(result) => result,
            Err(e) => {
                warn!("Skipping malformed result on line {}: {}", line_number, e);
                continue;
            }
        };

        if queue.send(result).is_err() {
            debug!("Input queue closed, stopping reader");
            break;
        }
        forwarded += 1;
    }

    Ok(forwarded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn test_forwards_valid_lines() {
        let input = concat!(
            r#"{"time_range": [0.0, 1.5], "transcribed_text": "hola", "translated_text": "hello"}"#,
            "\n\n",
            "not json\n",
            r#"{"time_range": [1.5, 3.0], "translated_text": null}"#,
            "\n",
        );
        let (tx, mut rx) = mpsc::unbounded_channel();

        let forwarded = forward_json_lines(BufReader::new(input.as_bytes()), tx)
            .await
            .unwrap();
        assert_eq!(forwarded, 2);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.translated_text.as_deref(), Some("hello"));
        let second = rx.recv().await.unwrap();
        assert_eq!(second.time_range, (1.5, 3.0));
        assert_eq!(second.translated_text, None);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_skipped() {
        let mut input = b"\xff\xfe garbage\n".to_vec();
        input.extend_from_slice(br#"{"time_range": [2.0, 3.0], "translated_text": "next"}"#);
        input.extend_from_slice(b"\r\n");
        let (tx, mut rx) = mpsc::unbounded_channel();

        let forwarded = forward_json_lines(BufReader::new(input.as_slice()), tx)
            .await
            .unwrap();
        assert_eq!(forwarded, 1);

        let result = rx.recv().await.unwrap();
        assert_eq!(result.translated_text.as_deref(), Some("next"));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_stops_when_consumer_dropped() {
        let input = "{\"time_range\": [0, 1]}\n{\"time_range\": [1, 2]}\n";
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        let forwarded = forward_json_lines(BufReader::new(input.as_bytes()), tx)
            .await
            .unwrap();
        assert_eq!(forwarded, 0);
    }
}

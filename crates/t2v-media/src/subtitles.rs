//! Subtitle document parsing and writing.
//!
//! Documents are sequences of blocks separated by blank lines:
//!
//! ```text
//! 1
//! 00:00:00,000 --> 00:00:02,000
//! A red kite rises over the hill.
//! ```

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use t2v_models::{format_timecode, parse_timecode, Cue};

use crate::error::{MediaError, MediaResult};

/// `start --> end`, optionally followed by positioning settings.
fn timing_line() -> &'static Regex {
    static TIMING: OnceLock<Regex> = OnceLock::new();
    TIMING.get_or_init(|| Regex::new(r"^\s*(\S+)\s*-->\s*(\S+)").expect("valid timing regex"))
}

/// Parse a subtitle document into cues, in document order.
///
/// An empty or whitespace-only document yields no cues. Blocks that do not
/// have the index / timing / text structure are skipped with a warning; a
/// non-empty document in which no block matches is rejected. Cue text lines
/// are joined and whitespace runs collapsed to single spaces.
pub fn parse_cues(document: &str) -> MediaResult<Vec<Cue>> {
    let document = document.strip_prefix('\u{feff}').unwrap_or(document);
    let document = document.replace("\r\n", "\n");

    if document.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut cues: Vec<Cue> = Vec::new();
    let mut skipped = 0usize;

    for block in split_blocks(&document) {
        match parse_block(&block)? {
            Some(cue) => {
                if let Some(prev) = cues.last() {
                    if cue.index <= prev.index {
                        return Err(MediaError::malformed(format!(
                            "cue index {} does not follow {}",
                            cue.index, prev.index
                        )));
                    }
                }
                cues.push(cue);
            }
            None => {
                skipped += 1;
                warn!(block = %block.join(" | "), "Skipping unrecognised subtitle block");
            }
        }
    }

    if cues.is_empty() {
        return Err(MediaError::malformed(format!(
            "no subtitle blocks recognised ({} blocks skipped)",
            skipped
        )));
    }

    debug!(cues = cues.len(), skipped, "Parsed subtitle document");
    Ok(cues)
}

/// Read and parse a subtitle document from disk.
pub async fn read_cues(path: impl AsRef<Path>) -> MediaResult<Vec<Cue>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(MediaError::NotFound(path.to_path_buf()));
    }
    let document = tokio::fs::read_to_string(path).await?;
    parse_cues(&document)
}

/// Serialize cues in the subtitle document format.
pub fn format_srt(cues: &[Cue]) -> String {
    let mut out = String::new();
    for cue in cues {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            cue.index,
            format_timecode(cue.start),
            format_timecode(cue.end),
            cue.text
        ));
    }
    out
}

/// Write cues to disk as a subtitle document.
pub async fn write_srt(path: impl AsRef<Path>, cues: &[Cue]) -> MediaResult<()> {
    tokio::fs::write(path.as_ref(), format_srt(cues)).await?;
    Ok(())
}

fn split_blocks(document: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for line in document.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// Parse one block. `Ok(None)` means the block lacks the cue structure;
/// a structurally valid block with a bad timecode is an error.
fn parse_block(lines: &[&str]) -> MediaResult<Option<Cue>> {
    let [index_line, timing, text @ ..] = lines else {
        return Ok(None);
    };
    if text.is_empty() {
        return Ok(None);
    }

    let index = match index_line.trim().parse::<u32>() {
        Ok(index) if index > 0 => index,
        _ => return Ok(None),
    };

    let Some(caps) = timing_line().captures(timing) else {
        return Ok(None);
    };
    let start = parse_timecode(&caps[1])?;
    let end = parse_timecode(&caps[2])?;

    let text = text
        .iter()
        .flat_map(|line| line.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ");

    Ok(Some(Cue::new(index, start, end, text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\n00:00:00,000 --> 00:00:02,000\nA red kite rises\nover the hill.\n\n2\n00:00:02,000 --> 00:00:02,300\nAnd\n\n3\n00:00:03,100 --> 00:00:05,750\nThe   wind   carries it far.\n";

    #[test]
    fn test_parse_cues_document_order() {
        let cues = parse_cues(SAMPLE).unwrap();
        assert_eq!(cues.len(), 3);
        assert_eq!(cues.iter().map(|c| c.index).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(cues[0].text, "A red kite rises over the hill.");
        assert_eq!(cues[2].text, "The wind carries it far.");
        assert!((cues[1].end - 2.3).abs() < 1e-9);
        assert!((cues[2].start - 3.1).abs() < 1e-9);
    }

    #[test]
    fn test_parse_cues_crlf_and_bom() {
        let doc = "\u{feff}1\r\n00:00:01,000 --> 00:00:02,500\r\nHello\r\n\r\n";
        let cues = parse_cues(doc).unwrap();
        assert_eq!(cues, vec![Cue::new(1, 1.0, 2.5, "Hello")]);
    }

    #[test]
    fn test_parse_cues_empty_document() {
        assert!(parse_cues("").unwrap().is_empty());
        assert!(parse_cues(" \n\n  \n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_cues_no_matching_blocks() {
        let err = parse_cues("just some text\nwithout cues\n").unwrap_err();
        assert!(matches!(err, MediaError::MalformedInput(_)));
    }

    #[test]
    fn test_parse_cues_skips_bad_blocks() {
        let doc = "garbage\n\n1\n00:00:00,000 --> 00:00:01,500\nKept\n";
        let cues = parse_cues(doc).unwrap();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "Kept");
    }

    #[test]
    fn test_parse_cues_bad_timecode() {
        let doc = "1\n00:00:00.000 --> 00:00:01,500\nText\n";
        assert!(matches!(parse_cues(doc), Err(MediaError::MalformedTimecode(_))));
    }

    #[test]
    fn test_parse_cues_rejects_decreasing_index() {
        let doc = "2\n00:00:00,000 --> 00:00:01,500\nB\n\n1\n00:00:01,500 --> 00:00:03,000\nA\n";
        assert!(matches!(parse_cues(doc), Err(MediaError::MalformedInput(_))));
    }

    #[test]
    fn test_format_then_parse() {
        let cues = vec![
            Cue::new(1, 0.0, 1.25, "one"),
            Cue::new(2, 1.5, 4.0, "two words"),
        ];
        assert_eq!(parse_cues(&format_srt(&cues)).unwrap(), cues);
    }

    #[tokio::test]
    async fn test_read_cues_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_cues(dir.path().join("missing.srt")).await.unwrap_err();
        assert!(matches!(err, MediaError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output1.srt");
        let cues = vec![Cue::new(1, 0.0, 2.0, "Hello there")];
        write_srt(&path, &cues).await.unwrap();
        assert_eq!(read_cues(&path).await.unwrap(), cues);
    }
}

//! Token loading: one ecash token per non-blank line.
//!
//! Tokens are opaque. Nothing here checks their format, length or
//! uniqueness; a duplicated token simply becomes two notes.

use crate::error::CashNoteError;
use std::path::Path;
use tracing::debug;

/// Read the token list at `path`, preserving order.
///
/// The file must be UTF-8; anything else is `InputReadFailed`. Ecash tokens
/// are ASCII, so a non-UTF-8 list is not a token list.
pub async fn load_tokens(path: &Path) -> Result<Vec<String>, CashNoteError> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(CashNoteError::InputNotFound {
            path: path.to_path_buf(),
        });
    }

    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CashNoteError::InputNotFound {
                path: path.to_path_buf(),
            }
        } else {
            CashNoteError::InputReadFailed {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    let tokens = parse_tokens(&text);
    debug!("Loaded {} tokens from {}", tokens.len(), path.display());
    Ok(tokens)
}

/// Split text into trimmed, non-empty lines.
pub fn parse_tokens(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_skipped() {
        let text = "cashuA1\n\n   \ncashuB2\n\t\ncashuC3\n";
        assert_eq!(parse_tokens(text), vec!["cashuA1", "cashuB2", "cashuC3"]);
    }

    #[test]
    fn tokens_are_trimmed_and_crlf_tolerated() {
        let text = "  cashuA1  \r\ncashuB2\r\n";
        assert_eq!(parse_tokens(text), vec!["cashuA1", "cashuB2"]);
    }

    #[test]
    fn duplicates_and_order_are_preserved() {
        let text = "b\na\nb\n";
        assert_eq!(parse_tokens(text), vec!["b", "a", "b"]);
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        assert!(parse_tokens("").is_empty());
        assert!(parse_tokens("\n \n").is_empty());
    }

    #[tokio::test]
    async fn missing_file_is_input_not_found() {
        let err = load_tokens(Path::new("/definitely/not/here/tokens.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, CashNoteError::InputNotFound { .. }));
    }

    #[tokio::test]
    async fn unreadable_input_is_read_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_tokens(dir.path()).await.unwrap_err();
        assert!(
            matches!(err, CashNoteError::InputReadFailed { .. }),
            "got: {err}"
        );
    }

    #[tokio::test]
    async fn non_utf8_input_is_read_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.txt");
        std::fs::write(&path, b"cashuA\n\xff\xfe\n").unwrap();
        let err = load_tokens(&path).await.unwrap_err();
        assert!(matches!(err, CashNoteError::InputReadFailed { .. }));
    }

    #[tokio::test]
    async fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.txt");
        std::fs::write(&path, "cashuA\n\ncashuB\n").unwrap();
        assert_eq!(load_tokens(&path).await.unwrap(), vec!["cashuA", "cashuB"]);
    }
}

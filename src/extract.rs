use regex::Regex;
use serde::Serialize;

lazy_static::lazy_static! {
    /// A fenced region: an opening fence with an optional language tag on its
    /// own line, the body, and the nearest closing fence.
    static ref FENCE: Regex =
        Regex::new(r"(?s)```[ \t]*([^\s`]*)[^\n]*\n(.*?)\n?```").expect("fence pattern is valid");
}

/// A fenced code region found in an answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeBlock {
    /// Empty when the fence has no language tag
    pub language: String,
    /// Body without the fence lines
    pub code: String,
}

/// Find every fenced code region in `text`, in document order.
///
/// Best effort: unterminated fences are ignored and nested fences close at the
/// first inner fence. Pure, so repeated calls on the same text agree.
pub fn extract_code_blocks(text: &str) -> Vec<CodeBlock> {
    FENCE
        .captures_iter(text)
        .map(|caps| CodeBlock {
            language: caps
                .get(1)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
            code: caps
                .get(2)
                .map(|m| m.as_str().trim_end_matches('\r').to_string())
                .unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_fences() {
        assert!(extract_code_blocks("").is_empty());
        assert!(extract_code_blocks("Plain prose with `inline` code.").is_empty());
    }

    #[test]
    fn test_single_block_excludes_fences() {
        let text = "Here you go:\n```rust\nfn main() {\n    println!(\"hi\");\n}\n```\nDone.";
        let blocks = extract_code_blocks(text);

        assert_eq!(
            blocks,
            vec![CodeBlock {
                language: "rust".to_string(),
                code: "fn main() {\n    println!(\"hi\");\n}".to_string(),
            }]
        );
        assert!(!blocks[0].code.contains("```"));
    }

    #[test]
    fn test_missing_language_is_empty_string() {
        let blocks = extract_code_blocks("```\nls -la\n```");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].language, "");
        assert_eq!(blocks[0].code, "ls -la");
    }

    #[test]
    fn test_multiple_blocks_in_order() {
        let text = "```python\nprint(1)\n```\nthen\n```js\nconsole.log(2)\n```";
        let langs: Vec<_> = extract_code_blocks(text)
            .into_iter()
            .map(|b| b.language)
            .collect();

        assert_eq!(langs, vec!["python", "js"]);
    }

    #[test]
    fn test_info_string_after_language() {
        let blocks = extract_code_blocks("```toml title=Cargo.toml\n[package]\n```");
        assert_eq!(blocks[0].language, "toml");
        assert_eq!(blocks[0].code, "[package]");
    }

    #[test]
    fn test_blank_lines_inside_block() {
        let blocks = extract_code_blocks("```\na\n\nb\n```");
        assert_eq!(blocks[0].code, "a\n\nb");
    }

    #[test]
    fn test_crlf_line_endings() {
        let blocks = extract_code_blocks("```sh\r\necho hi\r\n```");
        assert_eq!(blocks[0].language, "sh");
        assert_eq!(blocks[0].code, "echo hi");
    }

    #[test]
    fn test_unterminated_fence_is_ignored() {
        assert!(extract_code_blocks("```rust\nfn half(").is_empty());
    }

    #[test]
    fn test_idempotent() {
        let text = "```go\npackage main\n```\n```\nplain\n```";
        assert_eq!(extract_code_blocks(text), extract_code_blocks(text));
    }
}

use memchr::memmem;

/// Split content on `\n` exactly; a trailing newline yields a final empty line.
pub fn split_lines(content: &str) -> Vec<&str> {
    content.split('\n').collect()
}

/// Number of lines `split_lines` would return (never zero).
pub fn line_count(content: &str) -> usize {
    memchr::memchr_iter(b'\n', content.as_bytes()).count() + 1
}

/// Index of the first line containing `pattern` as a literal substring.
pub fn find_line_containing(lines: &[&str], pattern: &str) -> Option<usize> {
    let finder = memmem::Finder::new(pattern.as_bytes());
    lines
        .iter()
        .position(|line| finder.find(line.as_bytes()).is_some())
}

/// Insert the lines of `insertion` before `lines[at]` (clamped to the end) and rejoin.
pub fn splice_lines(lines: &[&str], at: usize, insertion: &str) -> String {
    let at = at.min(lines.len());
    let mut out: Vec<&str> = Vec::with_capacity(lines.len() + line_count(insertion));
    out.extend_from_slice(&lines[..at]);
    out.extend(insertion.split('\n'));
    out.extend_from_slice(&lines[at..]);
    out.join("\n")
}

/// `original` + `\n` + `tail`.
pub fn append_text(original: &str, tail: &str) -> String {
    let mut out = String::with_capacity(original.len() + 1 + tail.len());
    out.push_str(original);
    out.push('\n');
    out.push_str(tail);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_keeps_trailing_empty_line() {
        assert_eq!(split_lines("a\nb\n"), ["a", "b", ""]);
        assert_eq!(split_lines(""), [""]);
    }

    #[test]
    fn count_matches_split() {
        for s in ["", "a", "a\n", "a\nb\nc", "\n\n"] {
            assert_eq!(line_count(s), split_lines(s).len(), "input {s:?}");
        }
    }

    #[test]
    fn find_is_literal_not_regex() {
        let lines = ["fn main() {", "let v = a.*b;", "}"];
        assert_eq!(find_line_containing(&lines, ".*"), Some(1));
        assert_eq!(find_line_containing(&lines, "a+b"), None);
        assert_eq!(find_line_containing(&lines, "main()"), Some(0));
    }

    #[test]
    fn empty_pattern_matches_first_line() {
        assert_eq!(find_line_containing(&["x", "y"], ""), Some(0));
    }

    #[test]
    fn splice_beyond_end_appends_lines() {
        assert_eq!(splice_lines(&["a", "b"], 10, "c\nd"), "a\nb\nc\nd");
        assert_eq!(splice_lines(&["a", "b"], 1, "X"), "a\nX\nb");
    }
}

//! Source text extraction for course material and forum posts.

use std::fs;
use std::path::Path;

use vta_core::{AppError, AppResult};

/// Content type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Markdown,
    Html,
    PlainText,
    Unknown,
}

impl ContentType {
    /// Detect content type from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("md") | Some("markdown") => Self::Markdown,
            Some("html") | Some("htm") => Self::Html,
            Some("txt") => Self::PlainText,
            _ => Self::Unknown,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::PlainText => "text",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Read a course file. Markdown is returned raw so that it can be split on
/// headings; HTML is stripped to text.
pub fn read_source(path: &Path) -> AppResult<(ContentType, String)> {
    let content_type = ContentType::from_path(path);
    if !content_type.is_supported() {
        return Err(AppError::Other(format!("Unsupported file type: {:?}", path)));
    }

    let raw = fs::read_to_string(path)?;
    if raw.contains('\0') {
        tracing::warn!("Skipping likely binary file: {:?}", path);
        return Err(AppError::Other(format!("Binary file not supported: {:?}", path)));
    }

    let text = match content_type {
        ContentType::Html => clean_html(&raw),
        _ => raw,
    };

    Ok((content_type, text))
}

/// Clean markdown by removing heading markers, fences, rules and link syntax.
pub fn clean_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for line in text.lines() {
        let trimmed = line.trim_start_matches('#').trim();

        if trimmed.starts_with("---") || trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            continue;
        }

        if !trimmed.is_empty() {
            result.push_str(&strip_links(trimmed));
            result.push('\n');
        }
    }

    result.trim().to_string()
}

/// Replace `[label](target)` with `label` and drop image embeds.
fn strip_links(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;

    while let Some(open) = rest.find('[') {
        let Some(close) = rest[open..].find("](").map(|i| open + i) else {
            break;
        };
        let Some(end) = rest[close..].find(')').map(|i| close + i) else {
            break;
        };

        let is_image = rest[..open].ends_with('!');
        let prefix = if is_image { &rest[..open - 1] } else { &rest[..open] };
        out.push_str(prefix);
        if !is_image {
            out.push_str(&rest[open + 1..close]);
        }
        rest = &rest[end + 1..];
    }

    out.push_str(rest);
    out
}

/// Strip HTML tags, drop script and style bodies, decode character references
/// and collapse whitespace.
pub fn clean_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;
    let mut in_script = false;
    let mut in_style = false;

    for (i, ch) in text.char_indices() {
        if ch == '<' {
            in_tag = true;

            let tail = &text[i..];
            if starts_with_ignore_case(tail, "<script") {
                in_script = true;
            } else if starts_with_ignore_case(tail, "</script") {
                in_script = false;
            } else if starts_with_ignore_case(tail, "<style") {
                in_style = true;
            } else if starts_with_ignore_case(tail, "</style") {
                in_style = false;
            } else if starts_with_ignore_case(tail, "<br")
                || starts_with_ignore_case(tail, "</p")
                || starts_with_ignore_case(tail, "</li")
            {
                result.push(' ');
            }
        } else if ch == '>' {
            in_tag = false;
        } else if !in_tag && !in_script && !in_style {
            result.push(ch);
        }
    }

    decode_entities(&result)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .map(|head| head.eq_ignore_ascii_case(prefix))
        .unwrap_or(false)
}

/// Decode named (`&amp;`, `&nbsp;`, ...) and numeric (`&#8217;`, `&#x2F;`)
/// character references in one pass. Unknown references are kept verbatim.
fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest
            .char_indices()
            .take(12)
            .find(|&(_, c)| c == ';')
            .and_then(|(semi, _)| decode_entity(&rest[1..semi]).map(|ch| (ch, semi + 1)));

        match decoded {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(dec) = name.strip_prefix('#') {
        dec.parse::<u32>().ok()
    } else {
        return match name {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some(' '),
            "hellip" => Some('\u{2026}'),
            "lsquo" => Some('\u{2018}'),
            "rsquo" => Some('\u{2019}'),
            "ldquo" => Some('\u{201C}'),
            "rdquo" => Some('\u{201D}'),
            _ => None,
        };
    };

    code.and_then(char::from_u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_detection() {
        assert_eq!(ContentType::from_path(Path::new("week1.md")), ContentType::Markdown);
        assert_eq!(ContentType::from_path(Path::new("index.htm")), ContentType::Html);
        assert_eq!(ContentType::from_path(Path::new("notes.txt")), ContentType::PlainText);
        assert!(!ContentType::from_path(Path::new("logo.png")).is_supported());
    }

    #[test]
    fn test_clean_markdown() {
        let input = "# Header\n\nSee [the docs](https://docs.example) ![img](a.png)\n\n```bash\nuv run app.py\n```\n";
        let output = clean_markdown(input);
        assert_eq!(output, "Header\nSee the docs \nuv run app.py");
    }

    #[test]
    fn test_clean_html() {
        let input = "<div><p>Use <code>df.merge()</code> &amp; join</p><script>alert(1)</script><p>Done</p></div>";
        assert_eq!(clean_html(input), "Use df.merge() & join Done");
    }

    #[test]
    fn test_clean_html_non_ascii() {
        let input = "<p>Café – naïve <STYLE>p{}</STYLE>ok</p>";
        assert_eq!(clean_html(input), "Café – naïve ok");
    }

    #[test]
    fn test_clean_html_numeric_entities() {
        let input = "<p>It&#8217;s in src&#x2F;app.py &lt;3 &amp;lt; &copy;&#xZZ; &</p>";
        assert_eq!(clean_html(input), "It\u{2019}s in src/app.py <3 &lt; &copy;&#xZZ; &");
    }

    #[test]
    fn test_read_source_rejects_unknown() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, "x").unwrap();
        assert!(read_source(&path).is_err());
    }
}

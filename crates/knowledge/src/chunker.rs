//! Splitting course material into record-sized pieces.

/// A markdown section: the nearest heading and the text under it.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub heading: Option<String>,
    pub body: String,
}

/// Split markdown on ATX headings (`#` .. `######`).
///
/// Headings inside fenced code blocks are ignored. Sections with an empty
/// body are dropped.
pub fn split_markdown_sections(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut heading: Option<String> = None;
    let mut body = String::new();
    let mut in_fence = false;

    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
        }

        if !in_fence {
            if let Some(title) = heading_text(trimmed) {
                push_section(&mut sections, heading.take(), &body);
                body.clear();
                heading = Some(title);
                continue;
            }
        }

        body.push_str(line);
        body.push('\n');
    }
    push_section(&mut sections, heading, &body);

    sections
}

fn heading_text(line: &str) -> Option<String> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &line[level..];
    if !rest.starts_with(' ') {
        return None;
    }
    let title = rest.trim().trim_end_matches('#').trim();
    (!title.is_empty()).then(|| title.to_string())
}

fn push_section(sections: &mut Vec<Section>, heading: Option<String>, body: &str) {
    if body.trim().is_empty() {
        return;
    }
    sections.push(Section {
        heading,
        body: body.trim().to_string(),
    });
}

/// Chunk text into overlapping segments of at most `chunk_size` characters.
///
/// A trailing piece shorter than a tenth of `chunk_size` is merged into the
/// previous chunk, which may then exceed `chunk_size` by that much.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.trim().chars().collect();
    if chars.is_empty() {
        return vec![];
    }
    let chunk_size = chunk_size.max(1);
    if chars.len() <= chunk_size {
        return vec![chars.into_iter().collect()];
    }

    let step = if chunk_size > overlap {
        chunk_size - overlap
    } else {
        chunk_size
    };

    let mut chunks: Vec<String> = Vec::new();
    let mut last_start = None;
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        if let Some(previous) = last_start.filter(|_| end - start < chunk_size / 10) {
            let merged: String = chars[previous..].iter().collect();
            chunks.pop();
            chunks.push(merged.trim().to_string());
            break;
        }

        let piece: String = chars[start..end].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
            last_start = Some(start);
        }

        if end == chars.len() {
            break;
        }
        start += step;
    }

    tracing::trace!(
        "Chunked text into {} chunks (size: {}, overlap: {})",
        chunks.len(),
        chunk_size,
        overlap
    );

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sections() {
        let text = "Intro line\n\n# Docker\nRun containers.\n## Podman\nRootless.\n```sh\n# not a heading\n```\n## Empty\n";
        let sections = split_markdown_sections(text);

        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].heading, None);
        assert_eq!(sections[1].heading.as_deref(), Some("Docker"));
        assert_eq!(sections[2].heading.as_deref(), Some("Podman"));
        assert!(sections[2].body.contains("# not a heading"));
    }

    #[test]
    fn test_hashtag_is_not_heading() {
        assert_eq!(heading_text("#tds is fun"), None);
        assert_eq!(heading_text("### Week 2 ###"), Some("Week 2".to_string()));
    }

    #[test]
    fn test_chunk_text_short_is_single() {
        assert_eq!(chunk_text("  short  ", 100, 10), vec!["short".to_string()]);
        assert!(chunk_text("", 100, 10).is_empty());
    }

    #[test]
    fn test_chunk_text_no_overlap() {
        let text = "a".repeat(300);
        assert_eq!(chunk_text(&text, 100, 0).len(), 3);
    }

    #[test]
    fn test_chunk_text_with_overlap() {
        let text = "abcdefghijklmnopqrstuvwxyz".repeat(10);
        let chunks = chunk_text(&text, 50, 10);

        assert!(chunks.len() >= 2);
        let first_tail: String = chunks[0].chars().rev().take(10).collect::<Vec<_>>().into_iter().rev().collect();
        assert!(chunks[1].starts_with(&first_tail));
    }

    #[test]
    fn test_chunk_text_short_tail_is_kept() {
        let text = format!("{}{}", "a".repeat(1500), "bcdef");
        let chunks = chunk_text(&text, 1500, 0);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chars().count(), 1505);
        assert!(chunks[0].ends_with("bcdef"));
    }

    #[test]
    fn test_chunk_text_short_tail_after_overlap() {
        let text = format!("{} tail", "x".repeat(193));
        let chunks = chunk_text(&text, 100, 5);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].chars().count(), 103);
        assert!(chunks[1].ends_with("x tail"));
    }

    #[test]
    fn test_chunk_text_multibyte() {
        let text = "é".repeat(250);
        let chunks = chunk_text(&text, 100, 0);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 100);
    }
}

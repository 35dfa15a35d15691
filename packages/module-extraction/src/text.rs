//! Text helpers shared by the validator, inference engine and synthesizer.

/// Truncate `text` to at most `max_chars` characters without splitting a
/// word.
///
/// Prefers the last paragraph break inside the budget when it keeps at least
/// half of it, then the last whitespace. A single token longer than the
/// budget is dropped entirely. The result is always a prefix of `text`.
pub fn truncate_at_boundary(text: &str, max_chars: usize) -> &str {
    let cut = match text.char_indices().nth(max_chars) {
        Some((idx, _)) => idx,
        None => return text,
    };
    let window = &text[..cut];

    if let Some(para) = window.rfind("\n\n") {
        if para >= cut / 2 {
            return window[..para].trim_end();
        }
    }

    let next_is_space = text[cut..].chars().next().is_some_and(char::is_whitespace);
    if next_is_space {
        return window.trim_end();
    }

    match window.rfind(char::is_whitespace) {
        Some(ws) => window[..ws].trim_end(),
        None => "",
    }
}

/// Trim every line and collapse runs of blank lines to a single blank line.
pub fn normalize_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0usize;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            out.push_str(if blank_run > 0 { "\n\n" } else { "\n" });
        }
        blank_run = 0;
        out.push_str(line);
    }

    out
}

/// Lowercased words with surrounding punctuation removed.
pub fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
}

/// First sentence of `text`, capped at `max_chars` on a word boundary.
pub fn first_sentence(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    let end = text
        .char_indices()
        .find(|&(i, c)| {
            matches!(c, '.' | '!' | '?')
                && text[i + c.len_utf8()..]
                    .chars()
                    .next()
                    .map_or(true, char::is_whitespace)
        })
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(text.len());

    let sentence = &text[..end];
    if sentence.chars().count() <= max_chars {
        return sentence.to_string();
    }
    let cut = truncate_at_boundary(sentence, max_chars);
    if cut.is_empty() {
        sentence.chars().take(max_chars).collect()
    } else {
        format!("{}…", cut)
    }
}

/// Split prose into sentences on `.`, `!` or `?` followed by whitespace.
pub fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut iter = text.char_indices().peekable();

    while let Some((i, c)) = iter.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_break = iter.peek().map_or(true, |&(_, next)| next.is_whitespace());
            if at_break {
                let end = i + c.len_utf8();
                let sentence = text[start..end].trim();
                if !sentence.is_empty() {
                    out.push(sentence);
                }
                start = end;
            }
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

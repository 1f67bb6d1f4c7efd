use std::borrow::Cow;

/// Strip control characters from feed-supplied text.
///
/// Removes ASCII C0 controls (except tab, newline and carriage return) and DEL.
/// Returns `Cow::Borrowed` when the input contains nothing to strip, which is
/// the common case for well-formed feeds.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let is_control = |c: char| c == '\x7f' || (c < ' ' && c != '\t' && c != '\n' && c != '\r');

    if !s.chars().any(is_control) {
        return Cow::Borrowed(s);
    }

    Cow::Owned(s.chars().filter(|&c| !is_control(c)).collect())
}

/// Remove HTML tags and decode the handful of entities feeds commonly emit.
///
/// This is a plain-text snippet extractor, not an HTML parser: anything between
/// `<` and the next `>` is dropped, and tags are replaced with a space so that
/// adjacent block elements don't glue their words together.
pub fn strip_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;

    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if in_tag => {}
            _ => out.push(c),
        }
    }

    decode_entities(&out)
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    const ENTITIES: &[(&str, &str)] = &[
        ("&nbsp;", " "),
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&#39;", "'"),
        ("&apos;", "'"),
        ("&#8217;", "\u{2019}"),
        ("&#8216;", "\u{2018}"),
        ("&#8220;", "\u{201c}"),
        ("&#8221;", "\u{201d}"),
        ("&hellip;", "\u{2026}"),
        // Must run last so "&amp;lt;" decodes to "&lt;" and not "<"
        ("&amp;", "&"),
    ];

    let mut out = s.to_string();
    for (entity, replacement) in ENTITIES {
        if out.contains(entity) {
            out = out.replace(entity, replacement);
        }
    }
    out
}

/// Collapse every run of whitespace (including newlines) into a single space
/// and trim both ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Reduce arbitrary feed text to a single clean line.
pub fn plain_text(s: &str) -> String {
    collapse_whitespace(&strip_html(&strip_control_chars(s)))
}

/// Make feed text safe to embed inside a Telegram legacy-Markdown entity.
///
/// Legacy Markdown cannot escape characters inside an entity (link text,
/// italics), so reserved characters are replaced rather than escaped:
/// brackets become parentheses, underscores become spaces, and `*` / `` ` ``
/// are dropped.
pub fn neutralize_markdown(s: &str) -> Cow<'_, str> {
    if !s.contains(['_', '*', '`', '[', ']']) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '[' => out.push('('),
            ']' => out.push(')'),
            '_' => out.push(' '),
            '*' | '`' => {}
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Make a URL safe to place inside the `(...)` half of a Markdown link.
pub fn escape_link_target(url: &str) -> Cow<'_, str> {
    if !url.contains([')', '(', ' ']) {
        return Cow::Borrowed(url);
    }
    Cow::Owned(
        url.replace('(', "%28")
            .replace(')', "%29")
            .replace(' ', "%20"),
    )
}

/// Length of `s` in UTF-16 code units, the unit Telegram measures message size in.
pub fn utf16_len(s: &str) -> usize {
    s.chars().map(char::len_utf16).sum()
}

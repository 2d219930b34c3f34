use crate::format_source;

mod fmt;
mod walk;

fn assert_formats_to(source: &str, expected: &str) {
    let formatted = format_source(source)
        .unwrap_or_else(|err| panic!("formatting {:?} failed: {}", source, err));
    pretty_assertions::assert_str_eq!(formatted, expected);
}

/// Canonical input must survive formatting byte-for-byte.
fn assert_canonical(source: &str) {
    assert_formats_to(source, source);
}

fn assert_parser_error(source: &str, expected: &str) {
    let arena = bumpalo::Bump::new();
    let err = match crate::parse(source, &arena) {
        Ok(_) => panic!("expected {:?} to fail to parse", source),
        Err(err) => err,
    };
    let rendered = crate::diagnostics::render_parse_error(&err, "test.kata", source);
    pretty_assertions::assert_str_eq!(rendered, dedent(expected));
}

fn dedent(s: &str) -> String {
    let mut lines: Vec<&str> = s.lines().collect();

    if lines.first().is_some_and(|l| l.trim().is_empty()) {
        lines.remove(0);
    }
    if lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }

    let min_indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    lines
        .into_iter()
        .map(|l| if l.len() >= min_indent { &l[min_indent..] } else { l })
        .collect::<Vec<_>>()
        .join("\n")
}

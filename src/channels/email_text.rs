//! Email text cleanup before classification.
//!
//! Quoted replies and HTML markup would skew emotion scores toward whatever
//! the *previous* sender wrote, so sources run bodies through here first.
//! Pure string processing.

/// Remove quoted reply text from an email body.
///
/// Drops `>`-prefixed lines and everything after an `On ... wrote:`
/// attribution or an `Original Message` separator.
pub fn strip_quoted_text(body: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();

    for line in body.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with('>') {
            continue;
        }

        let is_attribution = trimmed.starts_with("On ") && trimmed.ends_with("wrote:");
        let is_separator = trimmed.starts_with("---") && trimmed.contains("Original Message");
        if is_attribution || is_separator {
            break;
        }

        kept.push(line);
    }

    while kept.last().is_some_and(|l| l.trim().is_empty()) {
        kept.pop();
    }

    kept.join("\n")
}

/// Strip tags from an HTML body and collapse whitespace.
pub fn strip_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Classifier input for an email: the subject line, a blank line, the body.
pub fn compose_content(subject: Option<&str>, body: &str) -> String {
    match subject.map(str::trim).filter(|s| !s.is_empty()) {
        Some(subject) if body.trim().is_empty() => subject.to_string(),
        Some(subject) => format!("{subject}\n\n{body}"),
        None => body.to_string(),
    }
}

//! TemplateRenderer port, plus the HTML-to-text helper used to derive the
//! plain-text alternative of a rendered email.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template {0:?} not found")]
    NotFound(String),

    #[error("failed to load templates from {root}: {reason}")]
    Load { root: String, reason: String },

    #[error("failed to render {template:?}: {reason}")]
    Render { template: String, reason: String },
}

pub trait TemplateRenderer: Send + Sync {
    /// Render `template` with a JSON object as context.
    fn render(&self, template: &str, context: &serde_json::Value) -> Result<String, RenderError>;
}

/// Remove markup from an HTML document, keeping its text.
///
/// `<script>`/`<style>` bodies and comments are dropped, common entities are
/// decoded, trailing whitespace is trimmed and runs of blank lines collapse
/// into one.
///
/// This is not Django's `strip_tags`: that one leaves entities such as
/// `&amp;` as written and keeps script and style text. Plain-text bodies
/// produced here differ from Django's for such input.
pub fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let after = &rest[start..];

        if let Some(comment) = after.strip_prefix("<!--") {
            rest = match comment.find("-->") {
                Some(end) => &comment[end + 3..],
                None => "",
            };
            continue;
        }

        let Some(end) = after.find('>') else {
            // A lone '<' is text, not a tag.
            out.push_str(after);
            rest = "";
            break;
        };

        let tag = &after[1..end];
        rest = &after[end + 1..];

        let closing = tag.starts_with('/');
        let name = tag
            .trim_start_matches('/')
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();

        if !closing && (name == "script" || name == "style") {
            let close = format!("</{name}");
            rest = match rest.to_ascii_lowercase().find(&close) {
                Some(i) => &rest[i..],
                None => "",
            };
        }
    }
    out.push_str(rest);

    tidy_lines(&decode_entities(&out))
}

fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp..];
        let decoded = after
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&after[1..semi]).map(|c| (c, semi)));

        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &after[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

fn tidy_lines(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut blank_run = 0;

    for line in s.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            out.push_str(if blank_run > 0 { "\n\n" } else { "\n" });
        }
        out.push_str(line.trim_start());
        blank_run = 0;
    }
    out
}

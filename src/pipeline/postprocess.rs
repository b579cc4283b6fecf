//! Deterministic clean-up of model output.
//!
//! Vision models occasionally wrap their answer in a code fence, emit CRLF,
//! pad lines with spaces, leave long runs of blank lines or link to images
//! that do not exist. Each rule below is a pure `&str → String` pass; order
//! matters only in that fences are stripped first and whitespace rules run
//! after anything that can leave empty lines behind.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply every clean-up rule to one page of Markdown.
pub fn clean_markdown(input: &str) -> String {
    let s = strip_outer_fence(input);
    let s = normalise_line_endings(&s);
    let s = remove_invisible_chars(&s);
    let s = unlink_local_images(&s);
    let s = trim_line_ends(&s);
    let s = collapse_blank_runs(&s);
    tidy_ends(&s)
}

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?[ \t]*\r?\n(.*?)\r?\n```$").unwrap());

fn strip_outer_fence(input: &str) -> String {
    let trimmed = input.trim();
    match RE_OUTER_FENCE.captures(trimmed) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn trim_line_ends(input: &str) -> String {
    input.lines().map(str::trim_end).collect::<Vec<_>>().join("\n")
}

static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// At most one blank line between blocks.
fn collapse_blank_runs(input: &str) -> String {
    RE_BLANK_RUN.replace_all(input, "\n\n").into_owned()
}

static RE_IMAGE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)]*)\)").unwrap());

/// Page images are transcribed in isolation, so any image link that is not
/// an absolute http(s) URL points at a file that does not exist. Keep the
/// alt text as an italic caption.
fn unlink_local_images(input: &str) -> String {
    RE_IMAGE_LINK
        .replace_all(input, |caps: &regex::Captures<'_>| {
            let url = caps[2].trim();
            if url.starts_with("http://") || url.starts_with("https://") {
                return caps[0].to_string();
            }
            let alt = caps[1].trim();
            if alt.is_empty() {
                String::new()
            } else {
                format!("*{alt}*")
            }
        })
        .into_owned()
}

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        ['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}', '\u{00AD}'],
        "",
    )
}

/// No leading blank lines, exactly one trailing newline.
fn tidy_ends(input: &str) -> String {
    let body = input.trim_start_matches('\n').trim_end();
    if body.is_empty() {
        String::new()
    } else {
        format!("{body}\n")
    }
}

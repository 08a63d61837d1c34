/// Renderer: the fragment log in, one polished story out.

use crate::schema::fragment::{join_sentence, Fragment, TERMINAL_PUNCTUATION};

/// Fragments lighter than this are left out of the story.
pub const DEFAULT_RENDER_THRESHOLD: f64 = 0.3;

const PUNCTUATION_RUNS: &[(&str, &str)] = &[("..", "."), (".!", "!"), (".?", "?"), (",.", ".")];

/// Render the fragments whose weight reaches `threshold`, in log order.
pub fn render(fragments: &[Fragment], threshold: f64) -> String {
    let mut story = String::new();
    for fragment in fragments {
        if fragment.weight < threshold || fragment.is_empty() {
            continue;
        }
        join_sentence(&mut story, &fragment.text);
    }
    if story.is_empty() {
        return story;
    }

    let story = tidy_punctuation(&story);
    let mut story = capitalize_sentences(&story);
    let trimmed = story.trim_end_matches([',', ';', ':']).len();
    story.truncate(trimmed);
    if !story.ends_with(TERMINAL_PUNCTUATION) {
        story.push('.');
    }
    story
}

fn tidy_punctuation(text: &str) -> String {
    let mut out = text.split_whitespace().collect::<Vec<_>>().join(" ");
    for mark in ['.', ',', '!', '?', ';', ':'] {
        out = out.replace(&format!(" {}", mark), &mark.to_string());
    }
    loop {
        let before = out.len();
        for (run, single) in PUNCTUATION_RUNS {
            out = out.replace(run, single);
        }
        if out.len() == before {
            return out;
        }
    }
}

/// Uppercase the first letter of the text and of every sentence.
fn capitalize_sentences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut sentence_start = true;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if sentence_start {
                out.extend(c.to_uppercase());
            } else {
                out.push(c);
            }
            sentence_start = false;
            continue;
        }
        if TERMINAL_PUNCTUATION.contains(&c) {
            sentence_start = true;
        }
        out.push(c);
    }
    out
}

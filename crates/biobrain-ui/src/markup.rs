//! Inline emphasis in answers: `**strong**` and `*italic*`.
//!
//! Markers pair up within a line only. An unpaired marker is kept as
//! literal text.

use egui::text::{LayoutJob, TextFormat};
use egui::{Color32, FontId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    Plain,
    Strong,
    Italic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub emphasis: Emphasis,
}

/// Split `text` into runs of uniform emphasis.
pub fn parse_spans(text: &str) -> Vec<Span> {
    let mut spans: Vec<Span> = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let (marker, emphasis) = if rest.starts_with("**") {
            ("**", Emphasis::Strong)
        } else if rest.starts_with('*') {
            ("*", Emphasis::Italic)
        } else {
            let next = rest.find('*').unwrap_or(rest.len());
            push(&mut spans, &rest[..next], Emphasis::Plain);
            rest = &rest[next..];
            continue;
        };

        let body = &rest[marker.len()..];
        match closing(body, marker) {
            Some(end) => {
                push(&mut spans, &body[..end], emphasis);
                rest = &body[end + marker.len()..];
            }
            None => {
                push(&mut spans, "*", Emphasis::Plain);
                rest = &rest[1..];
            }
        }
    }
    spans
}

/// Byte offset of the marker closing a run, on the same line.
fn closing(body: &str, marker: &str) -> Option<usize> {
    let line_end = body.find('\n').unwrap_or(body.len());
    body[..line_end].find(marker)
}

fn push(spans: &mut Vec<Span>, text: &str, emphasis: Emphasis) {
    if text.is_empty() {
        return;
    }
    match spans.last_mut() {
        Some(last) if last.emphasis == emphasis => last.text.push_str(text),
        _ => spans.push(Span {
            text: text.to_string(),
            emphasis,
        }),
    }
}

/// Lay out `text` with emphasis applied. Strong runs use `strong_color`,
/// the way egui renders `RichText::strong`.
pub fn layout_job(text: &str, size: f32, color: Color32, strong_color: Color32) -> LayoutJob {
    let mut job = LayoutJob::default();
    for span in parse_spans(text) {
        let format = TextFormat {
            font_id: FontId::proportional(size),
            color: match span.emphasis {
                Emphasis::Strong => strong_color,
                _ => color,
            },
            italics: span.emphasis == Emphasis::Italic,
            ..Default::default()
        };
        job.append(&span.text, 0.0, format);
    }
    job
}

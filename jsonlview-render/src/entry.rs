use crate::{
    color::{PLACEHOLDER_COLOR, TIME_COLOR, field_color},
    record::{HEADER_KEYS, LogRecord},
    timestamp::TimeShift,
};
use crossterm::style::Color;
use serde_json::Value;

/// spaces per nesting level
pub const INDENT_WIDTH: usize = 2;

const MESSAGE_ALIAS_KEY: &str = "0";
const MESSAGE_LABEL: &str = "message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub color: Option<Color>,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
        }
    }

    pub fn colored(text: impl Into<String>, color: Option<Color>) -> Self {
        Self {
            text: text.into(),
            color,
        }
    }
}

/// One display line. Nesting is carried only by `indent`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedLine {
    pub indent: usize,
    pub spans: Vec<Span>,
}

impl RenderedLine {
    pub fn new(indent: usize) -> Self {
        Self {
            indent,
            spans: Vec::new(),
        }
    }

    pub fn with(mut self, span: Span) -> Self {
        self.spans.push(span);
        self
    }

    /// the line as it reads on screen, without color
    pub fn text(&self) -> String {
        let mut out = " ".repeat(self.indent * INDENT_WIDTH);
        for span in &self.spans {
            out.push_str(&span.text);
        }
        out
    }
}

/// Renders one record into display lines: the header first, then every payload
/// field in its original order.
pub fn render_entry(record: &LogRecord, shift: &TimeShift) -> Vec<RenderedLine> {
    let mut lines = vec![header_line(record, shift)];

    match record.value() {
        Value::Object(map) => {
            for (key, value) in map {
                if HEADER_KEYS.contains(&key.as_str()) {
                    continue;
                }
                let label = match value {
                    Value::String(_) if key == MESSAGE_ALIAS_KEY => MESSAGE_LABEL,
                    _ => key.as_str(),
                };
                render_field(key, label, value, 1, &mut lines);
            }
        }
        Value::Array(items) => render_items(items, 1, &mut lines),
        scalar => lines.push(RenderedLine::new(1).with(Span::plain(scalar_text(scalar)))),
    }

    lines
}

fn header_line(record: &LogRecord, shift: &TimeShift) -> RenderedLine {
    let time = record.header_timestamp().map(|raw| shift.format_clock(&raw));
    let kind = record.kind();

    let line = RenderedLine::new(0);
    match (time, kind) {
        (Some(time), Some(kind)) => line
            .with(Span::colored(format!("[{}]", time), Some(TIME_COLOR)))
            .with(Span::plain(" "))
            .with(Span::colored(format!("[{}]", kind), field_color(&kind))),
        (Some(time), None) => line
            .with(Span::colored(format!("[{}]", time), Some(TIME_COLOR)))
            .with(Span::plain(" "))
            .with(Span::colored("[unknown-type]", Some(PLACEHOLDER_COLOR))),
        (None, Some(kind)) => line
            .with(Span::colored("[No timestamp]", Some(PLACEHOLDER_COLOR)))
            .with(Span::plain(" "))
            .with(Span::colored(format!("[{}]", kind), field_color(&kind))),
        (None, None) => line.with(Span::colored(
            "[No timestamp or type]",
            Some(PLACEHOLDER_COLOR),
        )),
    }
}

// `key` picks the color, `label` is what gets printed
fn render_field(
    key: &str,
    label: &str,
    value: &Value,
    depth: usize,
    lines: &mut Vec<RenderedLine>,
) {
    let label_span = Span::colored(format!("{}:", label), field_color(key));

    match value {
        Value::Object(map) => {
            lines.push(RenderedLine::new(depth).with(label_span));
            for (child_key, child_value) in map {
                render_field(child_key, child_key, child_value, depth + 1, lines);
            }
        }
        Value::Array(items) => {
            lines.push(RenderedLine::new(depth).with(label_span));
            render_items(items, depth + 1, lines);
        }
        scalar => lines.push(
            RenderedLine::new(depth)
                .with(label_span)
                .with(Span::plain(format!(" {}", scalar_text(scalar)))),
        ),
    }
}

fn render_items(items: &[Value], depth: usize, lines: &mut Vec<RenderedLine>) {
    for (index, item) in items.iter().enumerate() {
        match item {
            Value::Object(map) => {
                lines.push(RenderedLine::new(depth).with(Span::plain(format!("[{}]:", index))));
                for (child_key, child_value) in map {
                    render_field(child_key, child_key, child_value, depth + 1, lines);
                }
            }
            other => lines.push(
                RenderedLine::new(depth)
                    .with(Span::plain(format!("[{}]: {}", index, scalar_text(other)))),
            ),
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => simplify_escapes(s),
        other => other.to_string(),
    }
}

/// Collapses escape sequences that survived JSON decoding (and real line
/// breaks) so a value always fits on one display line.
pub fn simplify_escapes(s: &str) -> String {
    s.replace("\\n", " ")
        .replace("\\t", "    ")
        .replace("\\\"", "\"")
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .replace('\t', "    ")
}

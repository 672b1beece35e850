use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use tracing::trace;

use crate::annotation::{Annotation, AnnotationCollector, AnnotationTarget};
use crate::error::TemplateError;
use crate::vars::{Value, Vars};

/// Printer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterOptions {
    /// Character that opens and closes a variable in a template.
    pub delimiter: char,
    pub spaces_per_indent: usize,
    /// Characters a consuming callback may swallow right after its
    /// substitution.
    pub consume_after: String,
}

impl Default for PrinterOptions {
    fn default() -> Self {
        Self {
            delimiter: '$',
            spaces_per_indent: 2,
            consume_after: ";,".to_string(),
        }
    }
}

/// One piece of a template line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chunk<'t> {
    Text(&'t str),
    Var(&'t str),
    Start(&'t str),
    End(&'t str),
}

/// A `_start$tag$` waiting for its `_end$tag$`. The start offset is unset
/// while the cursor sits at the beginning of a line, and is fixed once
/// indentation for that line has been written.
#[derive(Debug)]
struct OpenRange {
    tag: String,
    start: Option<usize>,
}

enum Resolved<'a> {
    Text(String),
    Callback(Box<dyn FnMut(&mut Printer<'a>) -> bool + 'a>),
}

/// Template engine that writes generated text into an owned buffer.
///
/// Templates are split on the delimiter (`$` by default): `$name$` looks a
/// variable up in the frames pushed so far, innermost first, and `$$` is a
/// literal delimiter. Indentation is inserted lazily before the first
/// character of each line, so blank lines never carry trailing spaces.
///
/// ```
/// use proto_forge_printer::{Printer, PrinterOptions};
///
/// let mut p = Printer::new(PrinterOptions::default());
/// p.emit([("name", "Foo")], "class $name$ {\n");
/// p.indent();
/// p.emit([("field", "bar")], "int $field$;\n");
/// p.outdent();
/// p.emit([("name", "Foo")], "}\n");
/// assert_eq!(p.to_string(), "class Foo {\n  int bar;\n}\n");
/// ```
pub struct Printer<'a> {
    options: PrinterOptions,
    buffer: String,
    indent: usize,
    at_start_of_line: bool,
    line_start: usize,
    frames: Vec<Vars<'a>>,
    ranges: Vec<OpenRange>,
    substitutions: HashMap<String, (usize, usize)>,
    collector: Option<&'a mut dyn AnnotationCollector>,
}

impl<'a> Printer<'a> {
    pub fn new(options: PrinterOptions) -> Self {
        Self {
            options,
            buffer: String::new(),
            indent: 0,
            at_start_of_line: true,
            line_start: 0,
            frames: Vec::new(),
            ranges: Vec::new(),
            substitutions: HashMap::new(),
            collector: None,
        }
    }

    /// A printer that reports every closed annotation range to `collector`.
    pub fn with_collector(options: PrinterOptions, collector: &'a mut dyn AnnotationCollector) -> Self {
        Self {
            collector: Some(collector),
            ..Self::new(options)
        }
    }

    pub fn options(&self) -> &PrinterOptions {
        &self.options
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn into_string(self) -> String {
        self.buffer
    }

    pub fn bytes_written(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_at_start_of_line(&self) -> bool {
        self.at_start_of_line
    }

    /// Current indentation in spaces.
    pub fn indent_width(&self) -> usize {
        self.indent
    }

    // -- Templates --

    /// Expands `template` with `vars` pushed as the innermost frame.
    ///
    /// # Panics
    ///
    /// Panics on any [`TemplateError`]: an undefined variable, an
    /// unterminated variable, mismatched or unclosed range markers, or a
    /// recursive callback.
    pub fn emit(&mut self, vars: impl Into<Vars<'a>>, template: &str) {
        if let Err(error) = self.try_emit(vars, template) {
            panic!("{error}");
        }
    }

    /// [`emit`](Self::emit) that reports template errors instead of
    /// panicking. Output written before the error stays in the buffer.
    ///
    /// # Errors
    ///
    /// Returns the first [`TemplateError`] hit while expanding.
    pub fn try_emit(
        &mut self,
        vars: impl Into<Vars<'a>>,
        template: &str,
    ) -> Result<(), TemplateError> {
        self.frames.push(vars.into());
        let result = self.expand(template);
        self.frames.pop();
        trace!(bytes = self.buffer.len(), ok = result.is_ok(), "emitted template");
        result
    }

    /// Pushes a frame that stays active across `emit` calls.
    pub fn push_vars(&mut self, vars: impl Into<Vars<'a>>) {
        self.frames.push(vars.into());
    }

    /// # Panics
    ///
    /// Panics if no frame is active.
    pub fn pop_vars(&mut self) {
        if self.frames.pop().is_none() {
            panic!("pop_vars() without a matching push_vars()");
        }
    }

    /// Runs `f` with `vars` pushed, popping them afterwards.
    pub fn with_vars<R>(&mut self, vars: impl Into<Vars<'a>>, f: impl FnOnce(&mut Self) -> R) -> R {
        self.frames.push(vars.into());
        let result = f(self);
        self.frames.pop();
        result
    }

    /// Expands `template`. On error, ranges it left open are dropped.
    fn expand(&mut self, template: &str) -> Result<(), TemplateError> {
        let floor = self.ranges.len();
        let result = self.expand_lines(template, floor);
        if result.is_err() {
            self.ranges.truncate(floor);
        }
        result
    }

    fn expand_lines(&mut self, template: &str, floor: usize) -> Result<(), TemplateError> {
        let template = strip_raw_indent(template);

        for line in template.split_inclusive('\n') {
            let (body, newline) = match line.strip_suffix('\n') {
                Some(body) => (body, true),
                None => (line, false),
            };
            let chunks = split_line(body, self.options.delimiter)?;
            let markers_only = is_marker_line(&chunks);

            let mut consume_next = false;
            let mut ended_by_callback = false;
            for chunk in chunks {
                match chunk {
                    Chunk::Text(text) => {
                        if markers_only {
                            continue;
                        }
                        let mut text = text;
                        if std::mem::take(&mut consume_next) {
                            if let Some(c) = text.chars().next() {
                                if self.options.consume_after.contains(c) {
                                    text = &text[c.len_utf8()..];
                                }
                            }
                        }
                        if !text.is_empty() {
                            ended_by_callback = false;
                        }
                        self.write_text(text);
                    }
                    Chunk::Var(name) => {
                        let before = self.buffer.len();
                        let (consumed, was_callback) = self.substitute(name)?;
                        consume_next = consumed;
                        ended_by_callback =
                            was_callback && self.at_start_of_line && self.buffer.len() > before;
                    }
                    Chunk::Start(tag) => {
                        consume_next = false;
                        self.open_range(tag);
                    }
                    Chunk::End(tag) => {
                        consume_next = false;
                        self.close_range(tag)?;
                    }
                }
            }
            if newline && !markers_only && !ended_by_callback {
                self.write_text("\n");
            }
        }

        match self.ranges.get(floor) {
            Some(open) => Err(TemplateError::UnclosedRange(open.tag.clone())),
            None => Ok(()),
        }
    }

    /// Writes one variable. Returns whether a following consumable
    /// character should be dropped, and whether the value was a callback.
    fn substitute(&mut self, name: &str) -> Result<(bool, bool), TemplateError> {
        let undefined = || TemplateError::UndefinedVariable(name.to_string());
        let frame = self
            .frames
            .iter()
            .rposition(|f| f.values.contains_key(name))
            .ok_or_else(undefined)?;
        let resolved = match self.frames[frame].values.get_mut(name) {
            Some(Value::Text(text)) => Resolved::Text(text.clone()),
            Some(Value::Callback(slot)) => match slot.take() {
                Some(f) => Resolved::Callback(f),
                None => return Err(TemplateError::RecursiveCallback(name.to_string())),
            },
            None => return Err(undefined()),
        };

        match resolved {
            Resolved::Text(text) => {
                if !text.is_empty() && !text.starts_with('\n') {
                    self.ensure_indent();
                }
                let start = self.buffer.len();
                self.write_text(&text);
                self.substitutions
                    .insert(name.to_string(), (start, self.buffer.len()));
                Ok((false, false))
            }
            Resolved::Callback(mut f) => {
                let start = self.buffer.len();
                let saved = self.indent;
                if self.over_pure_indentation() {
                    // Lines the callback writes line up under its first one.
                    self.indent = self.buffer.len() - self.line_start;
                }
                let consumed = f(self);
                self.indent = saved;
                if let Some(Value::Callback(slot)) = self
                    .frames
                    .get_mut(frame)
                    .and_then(|vars| vars.values.get_mut(name))
                {
                    slot.restore(f);
                }
                self.substitutions
                    .insert(name.to_string(), (start, self.buffer.len()));
                Ok((consumed, true))
            }
        }
    }

    // -- Annotations --

    fn open_range(&mut self, tag: &str) {
        let start = (!self.at_start_of_line).then_some(self.buffer.len());
        self.ranges.push(OpenRange {
            tag: tag.to_string(),
            start,
        });
    }

    fn close_range(&mut self, tag: &str) -> Result<(), TemplateError> {
        let open = self.ranges.pop().ok_or_else(|| TemplateError::MismatchedRange {
            expected: None,
            found: tag.to_string(),
        })?;
        if open.tag != tag {
            return Err(TemplateError::MismatchedRange {
                expected: Some(open.tag),
                found: tag.to_string(),
            });
        }

        let mut end = self.buffer.len();
        if self.at_start_of_line && self.buffer.ends_with('\n') {
            end -= 1;
        }
        let start = open.start.unwrap_or(end).min(end);
        let target = self
            .frames
            .iter()
            .rev()
            .find_map(|vars| vars.annotations.get(tag))
            .cloned();
        if let Some(target) = target {
            self.record_annotation(start, end, target);
        }
        Ok(())
    }

    /// Annotates the span from the start of the last substitution of
    /// `begin_var` to the end of the last substitution of `end_var`.
    ///
    /// # Panics
    ///
    /// Panics if either variable has not been substituted yet, or if the
    /// span would end before it starts.
    pub fn annotate(&mut self, begin_var: &str, end_var: &str, target: AnnotationTarget) {
        let Some(&(start, _)) = self.substitutions.get(begin_var) else {
            panic!("annotation variable ${begin_var}$ was never printed");
        };
        let Some(&(_, end)) = self.substitutions.get(end_var) else {
            panic!("annotation variable ${end_var}$ was never printed");
        };
        if start > end {
            panic!("annotation span ${begin_var}$..${end_var}$ is inverted");
        }
        self.record_annotation(start, end, target);
    }

    fn record_annotation(&mut self, start: usize, end: usize, target: AnnotationTarget) {
        trace!(start, end, origin = %target.origin, "annotation");
        if let Some(collector) = self.collector.as_deref_mut() {
            collector.add_annotation(Annotation { start, end, target });
        }
    }

    // -- Indentation and raw output --

    pub fn indent(&mut self) {
        self.set_indent(self.indent + self.options.spaces_per_indent);
    }

    /// # Panics
    ///
    /// Panics when called more often than [`indent`](Self::indent).
    pub fn outdent(&mut self) {
        let Some(indent) = self.indent.checked_sub(self.options.spaces_per_indent) else {
            panic!("outdent() without a matching indent()");
        };
        self.set_indent(indent);
    }

    /// Changes the indent for coming lines. If the current line holds
    /// nothing but spaces it is rewritten to the new width.
    fn set_indent(&mut self, indent: usize) {
        self.indent = indent;
        if self.over_pure_indentation() {
            self.buffer.truncate(self.line_start);
            self.buffer.extend(std::iter::repeat(' ').take(indent));
        }
    }

    /// Writes `text` as is: no substitution and no indentation.
    pub fn emit_raw(&mut self, text: &str) {
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                self.push_newline();
            }
            if !line.is_empty() {
                self.at_start_of_line = false;
                self.fix_pending_starts();
                self.buffer.push_str(line);
            }
        }
    }

    fn over_pure_indentation(&self) -> bool {
        !self.at_start_of_line && self.buffer[self.line_start..].bytes().all(|b| b == b' ')
    }

    fn write_text(&mut self, text: &str) {
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                self.push_newline();
            }
            if !line.is_empty() {
                self.ensure_indent();
                self.buffer.push_str(line);
            }
        }
    }

    fn ensure_indent(&mut self) {
        if self.at_start_of_line {
            self.buffer.extend(std::iter::repeat(' ').take(self.indent));
            self.at_start_of_line = false;
        }
        self.fix_pending_starts();
    }

    fn fix_pending_starts(&mut self) {
        let offset = self.buffer.len();
        for range in &mut self.ranges {
            range.start.get_or_insert(offset);
        }
    }

    fn push_newline(&mut self) {
        self.buffer.push('\n');
        self.at_start_of_line = true;
        self.line_start = self.buffer.len();
    }
}

impl fmt::Display for Printer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.buffer)
    }
}

impl fmt::Debug for Printer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Printer")
            .field("options", &self.options)
            .field("indent", &self.indent)
            .field("bytes_written", &self.buffer.len())
            .field("frames", &self.frames.len())
            .field("open_ranges", &self.ranges)
            .finish_non_exhaustive()
    }
}

/// Splits one template line into text, variables and range markers.
fn split_line(line: &str, delimiter: char) -> Result<Vec<Chunk<'_>>, TemplateError> {
    let width = delimiter.len_utf8();
    let unterminated = || TemplateError::UnterminatedVariable {
        line: line.to_string(),
    };
    let mut chunks = Vec::new();
    let mut rest = line;
    while let Some(open) = rest.find(delimiter) {
        if open > 0 {
            chunks.push(Chunk::Text(&rest[..open]));
        }
        let after = &rest[open + width..];
        let close = after.find(delimiter).ok_or_else(unterminated)?;
        let name = &after[..close];
        rest = &after[close + width..];
        match name {
            "" => chunks.push(Chunk::Text(&after[..width])),
            "_start" | "_end" => {
                let tag_end = rest.find(delimiter).ok_or_else(unterminated)?;
                let tag = &rest[..tag_end];
                rest = &rest[tag_end + width..];
                chunks.push(if name == "_start" {
                    Chunk::Start(tag)
                } else {
                    Chunk::End(tag)
                });
            }
            _ => chunks.push(Chunk::Var(name)),
        }
    }
    if !rest.is_empty() {
        chunks.push(Chunk::Text(rest));
    }
    Ok(chunks)
}

/// True for a line of range markers and whitespace only.
fn is_marker_line(chunks: &[Chunk<'_>]) -> bool {
    let mut has_marker = false;
    for chunk in chunks {
        match chunk {
            Chunk::Start(_) | Chunk::End(_) => has_marker = true,
            Chunk::Text(text) if text.trim().is_empty() => {}
            _ => return false,
        }
    }
    has_marker
}

/// Removes the source-level indentation of a template written as an
/// indented multi-line literal starting with a newline.
///
/// The baseline is the indentation of the first non-blank line, skipping
/// leading `#` lines. A trailing whitespace-only line is dropped. Templates
/// of only blank lines are returned unchanged.
fn strip_raw_indent(template: &str) -> Cow<'_, str> {
    let Some(body) = template.strip_prefix('\n') else {
        return Cow::Borrowed(template);
    };
    let leading_spaces = |line: &str| line.len() - line.trim_start_matches(' ').len();
    let lines: Vec<&str> = body.split('\n').collect();
    let baseline = lines
        .iter()
        .skip_while(|line| line.trim_start().starts_with('#'))
        .find(|line| !line.trim().is_empty())
        .map(|line| leading_spaces(line));
    let Some(baseline) = baseline else {
        return Cow::Borrowed(template);
    };

    let last = lines.len() - 1;
    let mut out = String::with_capacity(body.len());
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if i == last && line.trim().is_empty() {
            break;
        }
        out.push_str(&line[leading_spaces(line).min(baseline)..]);
    }
    Cow::Owned(out)
}

use std::fmt;

use serde::{Deserialize, Serialize};

/// One dot-separated component of an option name.
///
/// `(my.ext).field` has two parts: the extension `my.ext` and the plain
/// name `field`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptionNamePart {
    pub name: String,
    pub is_extension: bool,
}

impl OptionNamePart {
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_extension: false,
        }
    }

    pub fn extension(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_extension: true,
        }
    }
}

impl fmt::Display for OptionNamePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_extension {
            write!(f, "({})", self.name)
        } else {
            f.write_str(&self.name)
        }
    }
}

/// The uninterpreted value of an option. Interpreting it against the
/// option's declared type is the linker's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum OptionValue {
    Identifier(String),
    PositiveInt(u64),
    NegativeInt(i64),
    Float(f64),
    String(String),
    /// Text-format body of a `{ ... }` aggregate, without the braces.
    Aggregate(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(s) => f.write_str(s),
            Self::PositiveInt(n) => write!(f, "{n}"),
            Self::NegativeInt(n) => write!(f, "{n}"),
            Self::Float(v) => {
                if v.is_infinite() {
                    f.write_str(if *v > 0.0 { "inf" } else { "-inf" })
                } else if v.is_nan() {
                    f.write_str("nan")
                } else if v.fract() == 0.0 && v.abs() < 1e16 {
                    write!(f, "{v:.1}")
                } else {
                    write!(f, "{v}")
                }
            }
            Self::String(s) => write!(f, "\"{}\"", escape_string(s)),
            Self::Aggregate(body) => write!(f, "{{ {body} }}"),
        }
    }
}

/// An `option name = value;` statement or a bracketed `[name = value]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionDef {
    pub name: Vec<OptionNamePart>,
    pub value: OptionValue,
}

impl OptionDef {
    pub fn new(name: Vec<OptionNamePart>, value: OptionValue) -> Self {
        Self { name, value }
    }

    /// The dotted name as written, e.g. `(foo.bar).baz`.
    pub fn name_string(&self) -> String {
        self.name
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }

    /// True when the name is the single plain identifier `name`.
    pub fn is_named(&self, name: &str) -> bool {
        matches!(self.name.as_slice(), [part] if !part.is_extension && part.name == name)
    }
}

impl fmt::Display for OptionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.name_string(), self.value)
    }
}

/// Escapes a decoded string so it can be written back between double quotes.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\{:03o}", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}

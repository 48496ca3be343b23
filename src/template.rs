//! Brace-delimited filename templates, e.g. `{audio_basename}_{index:03}.txt`.
//!
//! Syntax:
//! - `{name}` substitutes a value.
//! - `{name:spec}` applies a format spec: `[[fill]align][0][width][type]` where `align` is one of
//!   `<`, `>`, `^` and `type` is `d` (integers) or `s` (strings).
//! - `{{` and `}}` produce literal braces.
//!
//! The renderer does not know which names are valid. It fails on any placeholder that has no
//! value, and leaves allow-listing to configuration validation.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error(
        "what: missing template token '{name}'.; why: template requires it to render a valid filename; how-to-fix: pass '{name}' or remove that token from the template"
    )]
    MissingToken { name: String },

    #[error(
        "what: malformed template '{template}'.; why: {reason}; how-to-fix: use {{name}} or {{name:spec}} placeholders and double braces for literal braces"
    )]
    Malformed { template: String, reason: String },

    #[error(
        "what: unsupported format spec '{spec}' for token '{name}'.; why: {reason}; how-to-fix: use a zero-padded width such as {{index:03}} or drop the spec"
    )]
    UnsupportedFormat {
        name: String,
        spec: String,
        reason: String,
    },
}

/// A value that can be substituted into a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateValue {
    Int(u64),
    Str(String),
}

impl fmt::Display for TemplateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<u64> for TemplateValue {
    fn from(v: u64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for TemplateValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for TemplateValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// Named placeholder values for [`render`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateValues {
    values: BTreeMap<String, TemplateValue>,
}

impl TemplateValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<TemplateValue>) {
        self.values.insert(name.into(), value.into());
    }

    /// Builder-style [`TemplateValues::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<TemplateValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&TemplateValue> {
        self.values.get(name)
    }

    /// Add every value from `other`, overwriting names that already exist.
    pub fn extend(&mut self, other: TemplateValues) {
        self.values.extend(other.values);
    }
}

/// Render `template`, substituting every placeholder from `values`.
///
/// Fails fast: either the complete string is returned or an error naming the first problem.
pub fn render(template: &str, values: &TemplateValues) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    for piece in parse(template)? {
        match piece {
            Piece::Literal(text) => out.push_str(&text),
            Piece::Field { name, spec } => {
                let value = values
                    .get(&name)
                    .ok_or_else(|| TemplateError::MissingToken { name: name.clone() })?;
                spec.apply(&name, value, &mut out)?;
            }
        }
    }
    Ok(out)
}

/// Placeholder names referenced by `template`, in order of appearance.
pub fn placeholders(template: &str) -> Result<Vec<String>, TemplateError> {
    Ok(parse(template)?
        .into_iter()
        .filter_map(|piece| match piece {
            Piece::Field { name, .. } => Some(name),
            Piece::Literal(_) => None,
        })
        .collect())
}

enum Piece {
    Literal(String),
    Field { name: String, spec: FormatSpec },
}

fn parse(template: &str) -> Result<Vec<Piece>, TemplateError> {
    let malformed = |reason: &str| TemplateError::Malformed {
        template: template.to_owned(),
        reason: reason.to_owned(),
    };

    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') => return Err(malformed("nested '{' inside a placeholder")),
                        Some(ch) => field.push(ch),
                        None => return Err(malformed("unclosed '{'")),
                    }
                }

                let (name, spec) = match field.split_once(':') {
                    Some((name, spec)) => (name, spec),
                    None => (field.as_str(), ""),
                };
                if name.contains('!') {
                    return Err(malformed("conversion flags are not supported"));
                }
                if name.is_empty() {
                    return Err(malformed("placeholders must be named"));
                }

                let spec = FormatSpec::parse(name, spec)?;
                if !literal.is_empty() {
                    pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                }
                pieces.push(Piece::Field {
                    name: name.to_owned(),
                    spec,
                });
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '}' => return Err(malformed("single '}' encountered")),
            _ => literal.push(c),
        }
    }

    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    Ok(pieces)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
    Center,
}

impl Align {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '<' => Some(Self::Left),
            '>' => Some(Self::Right),
            '^' => Some(Self::Center),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct FormatSpec {
    raw: String,
    fill: Option<char>,
    align: Option<Align>,
    zero: bool,
    width: usize,
    kind: Option<char>,
}

impl FormatSpec {
    fn parse(name: &str, raw: &str) -> Result<Self, TemplateError> {
        let unsupported = |reason: &str| TemplateError::UnsupportedFormat {
            name: name.to_owned(),
            spec: raw.to_owned(),
            reason: reason.to_owned(),
        };

        let chars: Vec<char> = raw.chars().collect();
        let mut spec = FormatSpec {
            raw: raw.to_owned(),
            ..Self::default()
        };
        let mut i = 0;

        if let Some(align) = chars.get(1).copied().and_then(Align::from_char) {
            spec.fill = Some(chars[0]);
            spec.align = Some(align);
            i = 2;
        } else if let Some(align) = chars.first().copied().and_then(Align::from_char) {
            spec.align = Some(align);
            i = 1;
        }

        if chars.get(i) == Some(&'0') {
            spec.zero = true;
            i += 1;
        }

        let digits_start = i;
        while chars.get(i).is_some_and(char::is_ascii_digit) {
            i += 1;
        }
        if i > digits_start {
            let digits: String = chars[digits_start..i].iter().collect();
            spec.width = digits
                .parse()
                .map_err(|_| unsupported("width is too large"))?;
        }

        match chars.get(i) {
            Some(&kind) if kind == 'd' || kind == 's' => {
                spec.kind = Some(kind);
                i += 1;
            }
            Some(_) => return Err(unsupported("only fill, alignment, width, and d/s types are supported")),
            None => {}
        }

        if i != chars.len() {
            return Err(unsupported("unexpected characters after the format type"));
        }
        Ok(spec)
    }

    fn apply(&self, name: &str, value: &TemplateValue, out: &mut String) -> Result<(), TemplateError> {
        let mismatch = |reason: &str| TemplateError::UnsupportedFormat {
            name: name.to_owned(),
            spec: self.raw.clone(),
            reason: reason.to_owned(),
        };

        match (self.kind, value) {
            (Some('d'), TemplateValue::Str(_)) => {
                return Err(mismatch("'d' applies to integer tokens only"));
            }
            (Some('s'), TemplateValue::Int(_)) => {
                return Err(mismatch("'s' applies to string tokens only"));
            }
            _ => {}
        }

        let text = value.to_string();
        let len = text.chars().count();
        if len >= self.width {
            out.push_str(&text);
            return Ok(());
        }

        let default_align = match value {
            TemplateValue::Int(_) => Align::Right,
            TemplateValue::Str(_) => Align::Left,
        };
        let align = self.align.unwrap_or(default_align);
        let fill = self.fill.unwrap_or(if self.zero { '0' } else { ' ' });

        let pad = self.width - len;
        let (left, right) = match align {
            Align::Left => (0, pad),
            Align::Right => (pad, 0),
            Align::Center => (pad / 2, pad - pad / 2),
        };
        out.extend(std::iter::repeat_n(fill, left));
        out.push_str(&text);
        out.extend(std::iter::repeat_n(fill, right));
        Ok(())
    }
}

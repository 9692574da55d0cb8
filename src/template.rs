use std::fmt;

use crate::error::{Error, Result};

/// Default report line when hostnames are looked up.
pub const DEFAULT_TEMPLATE: &str = "{cnt} {host} ({ip})";

/// Default report line with `--numeric`.
pub const NUMERIC_TEMPLATE: &str = "{cnt} {ip}";

/// A value a report line can refer to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    /// `{cnt}`: the number of occurrences.
    Count,
    /// `{ip}`: the address as counted.
    Ip,
    /// `{host}`: the resolved name, or the address when unresolved.
    Host,
}

impl Field {
    fn from_name(name: &str) -> Option<Field> {
        match name {
            "cnt" => Some(Field::Count),
            "ip" => Some(Field::Ip),
            "host" => Some(Field::Host),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Field::Count => "cnt",
            Field::Ip => "ip",
            Field::Host => "host",
        }
    }
}

/// A pre-compiled report line template.
///
/// Templates use `{field}` syntax for field references, where field is one of
/// `cnt`, `ip` or `host`. Use `{{` and `}}` for literal braces.
///
/// The template is parsed once into a sequence of literal and field segments.
/// Rendering is a single left-to-right pass, so a value containing braces is
/// never expanded again.
#[derive(Clone, Debug)]
pub struct Template {
    parts: Vec<TemplatePart>,
}

#[derive(Clone, Debug)]
enum TemplatePart {
    Literal(String),
    Field(Field),
}

impl Template {
    /// Compile a template string into a pre-parsed representation.
    ///
    /// An unclosed `{` (no matching `}`) is treated as a literal.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidTemplate` for an empty or unknown field name.
    pub fn compile(template: &str) -> Result<Template> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut rest = template;

        while let Some(c) = rest.chars().next() {
            if rest.starts_with("{{") {
                literal.push('{');
                rest = &rest[2..];
            } else if rest.starts_with("}}") {
                literal.push('}');
                rest = &rest[2..];
            } else if c == '{' {
                let Some(close) = rest.find('}') else {
                    literal.push_str(rest);
                    break;
                };
                let name = &rest[1..close];
                let field = Field::from_name(name).ok_or_else(|| Error::InvalidTemplate {
                    reason: if name.is_empty() {
                        "empty field name".to_string()
                    } else {
                        format!("unknown field {{{name}}}, expected {{cnt}}, {{ip}} or {{host}}")
                    },
                })?;
                if !literal.is_empty() {
                    parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
                }
                parts.push(TemplatePart::Field(field));
                rest = &rest[close + 1..];
            } else {
                literal.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }

        if !literal.is_empty() {
            parts.push(TemplatePart::Literal(literal));
        }

        Ok(Template { parts })
    }

    /// Whether the template refers to `field`.
    #[must_use]
    pub fn uses(&self, field: Field) -> bool {
        self.parts
            .iter()
            .any(|part| matches!(part, TemplatePart::Field(f) if *f == field))
    }

    /// Renders the template and writes it to the writer.
    ///
    /// Literals are written as-is; for each field the closure receives the
    /// writer and the field, and should write the corresponding value.
    ///
    /// # Errors
    ///
    /// Returns `std::io::Result` if writing to the provided writer fails.
    #[inline]
    pub fn write<W, L>(&self, wtr: &mut W, mut lookup: L) -> std::io::Result<()>
    where
        W: std::io::Write + ?Sized,
        L: FnMut(&mut W, Field) -> std::io::Result<()>,
    {
        for part in &self.parts {
            match part {
                TemplatePart::Literal(s) => wtr.write_all(s.as_bytes())?,
                TemplatePart::Field(f) => lookup(wtr, *f)?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            match part {
                TemplatePart::Literal(s) => {
                    write!(f, "{}", s.replace('{', "{{").replace('}', "}}"))?
                }
                TemplatePart::Field(field) => write!(f, "{{{}}}", field.name())?,
            }
        }
        Ok(())
    }
}

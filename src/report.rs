use std::io;

use serde::Serialize;
use termcolor::{Color, ColorSpec, WriteColor};

use crate::error::{Error, Result};
use crate::rank::Entry;
use crate::resolver::Hostname;
use crate::template::{Field, Template, DEFAULT_TEMPLATE, NUMERIC_TEMPLATE};

/// How the report is printed.
#[derive(Clone, Debug)]
enum Format {
    Text(Template),
    Json,
}

/// JSON shape of a single report line.
#[derive(Serialize)]
struct Record<'a> {
    ip: &'a str,
    count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    host: Option<&'a str>,
}

impl<'a> From<&'a Entry> for Record<'a> {
    fn from(entry: &'a Entry) -> Self {
        let host = match &entry.hostname {
            Some(Hostname::Resolved(name)) => Some(name.as_str()),
            _ => None,
        };
        Record {
            ip: &entry.address,
            count: entry.count,
            host,
        }
    }
}

/// Writes ranked entries, one per line.
#[derive(Clone, Debug)]
pub struct Reporter {
    format: Format,
}

impl Reporter {
    /// A text reporter using `template`, or the default template for the
    /// lookup mode when none is given.
    ///
    /// # Errors
    ///
    /// Fails when the template is invalid, or uses `{host}` while hostnames
    /// are not looked up.
    pub fn text(template: Option<&str>, resolves: bool) -> Result<Reporter> {
        let template = match template {
            Some(template) => Template::compile(template)?,
            None if resolves => Template::compile(DEFAULT_TEMPLATE)?,
            None => Template::compile(NUMERIC_TEMPLATE)?,
        };
        if !resolves && template.uses(Field::Host) {
            return Err(Error::HostWithoutResolve);
        }
        Ok(Reporter {
            format: Format::Text(template),
        })
    }

    /// A reporter printing one JSON object per line.
    pub fn json() -> Reporter {
        Reporter {
            format: Format::Json,
        }
    }

    /// Write every entry, in the given order.
    pub fn write<W: WriteColor>(&self, wtr: &mut W, entries: &[Entry]) -> io::Result<()> {
        let mut highlight = ColorSpec::new();
        highlight.set_fg(Some(Color::Red)).set_bold(true);
        let mut count = itoa::Buffer::new();

        for entry in entries {
            match &self.format {
                Format::Text(template) => {
                    template.write(wtr, |w, field| match field {
                        Field::Count => w.write_all(count.format(entry.count).as_bytes()),
                        Field::Ip => {
                            w.set_color(&highlight)?;
                            w.write_all(entry.address.as_bytes())?;
                            w.reset()
                        }
                        Field::Host => w.write_all(entry.host().as_bytes()),
                    })?;
                }
                Format::Json => {
                    serde_json::to_writer(&mut *wtr, &Record::from(entry))?;
                }
            }
            wtr.write_all(b"\n")?;
        }
        wtr.flush()
    }
}

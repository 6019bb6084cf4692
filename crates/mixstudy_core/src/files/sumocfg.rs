use std::path::{Path, PathBuf};

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::error::XmlFileError;

use super::{attribute, element_name, malformed, read_text};

/// A simulator configuration file used as the template for every run.
///
/// Rendering replaces the `value` of `net-file` and `route-files`, and sets
/// `emission-output`, inserting it (and a `processing` section) when the
/// template has none. Relative paths in any other `*-file` or `*-files`
/// option are resolved against the template's directory, since the rendered
/// file lives in a run directory elsewhere. All other options are copied
/// verbatim.
#[derive(Debug, Clone)]
pub struct ConfigTemplate {
    path: PathBuf,
    content: String,
}

impl ConfigTemplate {
    pub fn load(path: &Path) -> Result<Self, XmlFileError> {
        let content = read_text(path)?;
        let path = std::path::absolute(path).map_err(|source| XmlFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { path, content })
    }

    pub fn from_content(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn render(
        &self,
        net_file: &str,
        route_file: &str,
        emission_file: &str,
    ) -> Result<String, XmlFileError> {
        let base = self.path.parent().unwrap_or(Path::new(""));
        render(&self.content, base, net_file, route_file, emission_file)
            .map_err(|e| malformed(&self.path, e))
    }
}

fn render(
    content: &str,
    base: &Path,
    net_file: &str,
    route_file: &str,
    emission_file: &str,
) -> Result<String, quick_xml::Error> {
    let mut reader = Reader::from_str(content);
    let mut writer = Writer::new(Vec::new());

    let replacement = |name: &[u8]| -> Option<&str> {
        match name {
            b"net-file" => Some(net_file),
            b"route-files" => Some(route_file),
            b"emission-output" => Some(emission_file),
            _ => None,
        }
    };

    let mut needs_output = !contains_element(content, b"emission-output")?;
    let mut has_processing = false;
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                if e.name().as_ref() == b"processing" {
                    has_processing = true;
                }
                match replacement(e.name().as_ref()) {
                    Some(value) => writer.write_event(Event::Start(with_value(&e, value)?))?,
                    None => writer.write_event(Event::Start(resolve_file_option(e, base)?))?,
                }
            }
            Event::Empty(e) if e.name().as_ref() == b"processing" && needs_output => {
                // Expand `<processing/>` to hold the output option
                has_processing = true;
                writer.write_event(Event::Start(e.borrow()))?;
                write_emission_output(&mut writer, emission_file)?;
                writer.write_event(Event::End(BytesEnd::new("processing")))?;
                needs_output = false;
            }
            Event::Empty(e) => {
                if e.name().as_ref() == b"processing" {
                    has_processing = true;
                }
                match replacement(e.name().as_ref()) {
                    Some(value) => writer.write_event(Event::Empty(with_value(&e, value)?))?,
                    None => writer.write_event(Event::Empty(resolve_file_option(e, base)?))?,
                }
            }
            Event::End(e) => {
                if needs_output && e.name().as_ref() == b"processing" {
                    write_emission_output(&mut writer, emission_file)?;
                    needs_output = false;
                }
                if needs_output && depth == 1 && !has_processing {
                    writer.write_event(Event::Start(BytesStart::new("processing")))?;
                    write_emission_output(&mut writer, emission_file)?;
                    writer.write_event(Event::End(BytesEnd::new("processing")))?;
                    needs_output = false;
                }
                depth = depth.saturating_sub(1);
                writer.write_event(Event::End(e))?;
            }
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
    }

    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}

fn is_file_option(name: &[u8]) -> bool {
    name.ends_with(b"-file") || name.ends_with(b"-files")
}

/// Rewrite the relative entries of a file option's comma-separated value
/// against `base`. Other elements pass through unchanged.
fn resolve_file_option<'a>(
    element: BytesStart<'a>,
    base: &Path,
) -> Result<BytesStart<'a>, quick_xml::Error> {
    if base.as_os_str().is_empty() || !is_file_option(element.name().as_ref()) {
        return Ok(element);
    }
    let Some(value) = attribute(&element, "value")? else {
        return Ok(element);
    };
    let resolved = value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            if Path::new(entry).is_absolute() {
                entry.to_string()
            } else {
                base.join(entry).display().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(",");
    if resolved == value {
        return Ok(element);
    }
    with_value(&element, &resolved)
}

fn contains_element(content: &str, name: &[u8]) -> Result<bool, quick_xml::Error> {
    let mut reader = Reader::from_str(content);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == name => return Ok(true),
            Event::Eof => return Ok(false),
            _ => {}
        }
    }
}

fn write_emission_output(
    writer: &mut Writer<Vec<u8>>,
    emission_file: &str,
) -> Result<(), quick_xml::Error> {
    let mut element = BytesStart::new("emission-output");
    element.push_attribute(("value", emission_file));
    writer.write_event(Event::Empty(element))?;
    Ok(())
}

fn with_value(element: &BytesStart<'_>, value: &str) -> Result<BytesStart<'static>, quick_xml::Error> {
    let mut rewritten = BytesStart::new(element_name(element));
    let mut replaced = false;
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == b"value" {
            rewritten.push_attribute(("value", value));
            replaced = true;
        } else {
            rewritten.push_attribute(attr);
        }
    }
    if !replaced {
        rewritten.push_attribute(("value", value));
    }
    Ok(rewritten.into_owned())
}

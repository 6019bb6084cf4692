//! Simulator file formats: road network, route files, run configuration
//! and emission output.
//!
//! Only the fields the study reads or writes are modelled; everything else
//! in a template is passed through untouched.

mod emissions;
mod flows;
mod network;
mod routes;
mod sumocfg;

pub use emissions::parse_emissions;
pub use flows::{FlowRescale, FlowTemplate, rescale_flows};
pub use network::{load_edges, parse_edges};
pub use routes::{parse_routes, read_route_file, render_routes, write_route_file};
pub use sumocfg::ConfigTemplate;

use std::fmt::Display;
use std::fs;
use std::path::Path;

use quick_xml::events::BytesStart;

use crate::error::XmlFileError;

fn read_text(path: &Path) -> Result<String, XmlFileError> {
    fs::read_to_string(path).map_err(|source| XmlFileError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_text(path: &Path, content: &[u8]) -> Result<(), XmlFileError> {
    fs::write(path, content).map_err(|source| XmlFileError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn malformed(path: &Path, reason: impl Display) -> XmlFileError {
    XmlFileError::Malformed {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Unescaped value of an attribute, `None` when absent
fn attribute(element: &BytesStart<'_>, name: &str) -> Result<Option<String>, quick_xml::Error> {
    match element.try_get_attribute(name)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

fn element_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.name().as_ref()).into_owned()
}

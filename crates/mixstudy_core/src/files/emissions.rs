use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::ArtifactError;
use crate::model::EmissionSummary;

/// Sum the per-timestep, per-vehicle emission records of a simulator
/// emission artifact. Missing attributes count as zero; a missing,
/// empty or truncated file is an error, as is any amount that is negative
/// or not finite.
pub fn parse_emissions(path: &Path) -> Result<EmissionSummary, ArtifactError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ArtifactError::Missing(path.to_path_buf()));
        }
        Err(source) => {
            return Err(ArtifactError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    sum_emissions(BufReader::new(file)).map_err(|reason| ArtifactError::Malformed {
        path: path.to_path_buf(),
        reason,
    })
}

fn sum_emissions<R: BufRead>(input: R) -> Result<EmissionSummary, String> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);

    let mut summary = EmissionSummary::default();
    let mut buf = Vec::new();
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut saw_root = false;
    let mut vehicles = 0usize;

    loop {
        match reader.read_event_into(&mut buf).map_err(|e| e.to_string())? {
            Event::Start(e) => {
                saw_root = true;
                if is_vehicle_record(&e, &stack) {
                    summary.accumulate(vehicle_record(&e)?);
                    vehicles += 1;
                }
                stack.push(e.name().as_ref().to_vec());
            }
            Event::Empty(e) => {
                saw_root = true;
                if is_vehicle_record(&e, &stack) {
                    summary.accumulate(vehicle_record(&e)?);
                    vehicles += 1;
                }
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err("no root element".to_string());
    }
    if !stack.is_empty() {
        return Err(format!(
            "document ends inside <{}>; the run was probably interrupted",
            String::from_utf8_lossy(stack.last().map(Vec::as_slice).unwrap_or_default())
        ));
    }

    tracing::trace!(vehicles, "summed emission records");
    Ok(summary)
}

fn is_vehicle_record(element: &BytesStart<'_>, stack: &[Vec<u8>]) -> bool {
    element.name().as_ref() == b"vehicle"
        && stack.last().is_some_and(|parent| parent.as_slice() == b"timestep")
}

fn vehicle_record(element: &BytesStart<'_>) -> Result<[f64; 6], String> {
    let mut record = [0.0; 6];
    for attr in element.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let Some(slot) = EmissionSummary::ATTRIBUTES
            .iter()
            .position(|name| name.as_bytes() == attr.key.as_ref())
        else {
            continue;
        };
        let name = EmissionSummary::ATTRIBUTES[slot];
        let value = attr.unescape_value().map_err(|e| e.to_string())?;
        let amount = value
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("attribute {name} has non-numeric value '{value}'"))?;
        // Emitted amounts are finite and non-negative
        if !amount.is_finite() || amount < 0.0 {
            return Err(format!("attribute {name} has invalid amount '{value}'"));
        }
        record[slot] = amount;
    }
    Ok(record)
}

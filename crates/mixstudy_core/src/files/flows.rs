//! Rescale the `<flow>` entries of an existing route file to a new vehicle
//! mix while holding the total vehicle count fixed.
//!
//! Both levels of rounding use the largest-remainder allocator: the total
//! is first split across vehicle types, then each type's share is split
//! across that type's flows in proportion to their original `number`.

use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::allocation::{allocate, apportion};
use crate::error::XmlFileError;
use crate::model::{AllocationVector, ProportionVector};

use super::{attribute, element_name, malformed, read_text};

/// A rewritten route document and the per-type counts it now carries
#[derive(Debug, Clone)]
pub struct FlowRescale {
    pub content: String,
    pub allocation: AllocationVector,
}

struct FlowEntry {
    type_index: Option<usize>,
    number: u64,
}

/// A base route file whose flows are rescaled for every run
#[derive(Debug, Clone)]
pub struct FlowTemplate {
    path: PathBuf,
    content: String,
}

impl FlowTemplate {
    pub fn load(path: &Path) -> Result<Self, XmlFileError> {
        Ok(Self {
            path: path.to_path_buf(),
            content: read_text(path)?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Vehicles carried by flows of the given types
    pub fn total(&self, vehicle_types: &[String]) -> Result<u64, XmlFileError> {
        let flows = collect_flows(&self.content, vehicle_types).map_err(|e| malformed(&self.path, e))?;
        Ok(known_total(&flows))
    }

    pub fn rescale(
        &self,
        vehicle_types: &[String],
        proportions: &ProportionVector,
    ) -> Result<FlowRescale, XmlFileError> {
        rescale_flows(&self.content, &self.path, vehicle_types, proportions)
    }
}

fn known_total(flows: &[FlowEntry]) -> u64 {
    flows
        .iter()
        .filter(|f| f.type_index.is_some())
        .map(|f| f.number)
        .sum()
}

/// Rewrite flow `number`s in `content` so per-type totals follow
/// `proportions` (aligned with `vehicle_types`). Flows of other types are
/// left as they are. `path` is only used for error reporting.
pub fn rescale_flows(
    content: &str,
    path: &Path,
    vehicle_types: &[String],
    proportions: &ProportionVector,
) -> Result<FlowRescale, XmlFileError> {
    let flows = collect_flows(content, vehicle_types).map_err(|e| malformed(path, e))?;

    let allocation = allocate(proportions, known_total(&flows));

    let mut numbers: Vec<u64> = flows.iter().map(|f| f.number).collect();
    for (t, vehicle_type) in vehicle_types.iter().enumerate() {
        let members: Vec<usize> = flows
            .iter()
            .enumerate()
            .filter(|(_, f)| f.type_index == Some(t))
            .map(|(i, _)| i)
            .collect();
        let count = allocation.get(t).unwrap_or(0);

        if members.is_empty() {
            if count > 0 {
                return Err(XmlFileError::NoFlowsForType {
                    path: path.to_path_buf(),
                    vehicle_type: vehicle_type.clone(),
                });
            }
            continue;
        }

        let weights: Vec<f64> = members.iter().map(|&i| flows[i].number as f64).collect();
        let split = apportion(&weights, count)
            .or_else(|| apportion(&vec![1.0; members.len()], count))
            .unwrap_or_else(|| vec![0; members.len()]);
        for (&i, n) in members.iter().zip(split) {
            numbers[i] = n;
        }
    }

    let content = rewrite_numbers(content, &numbers).map_err(|e| malformed(path, e))?;
    Ok(FlowRescale {
        content,
        allocation,
    })
}

fn collect_flows(content: &str, vehicle_types: &[String]) -> Result<Vec<FlowEntry>, String> {
    let mut reader = Reader::from_str(content);
    let mut flows = Vec::new();

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"flow" => {
                let vehicle_type = attribute(&e, "type").map_err(|e| e.to_string())?;
                let number = attribute(&e, "number")
                    .map_err(|e| e.to_string())?
                    .ok_or("flow is missing the 'number' attribute")?;
                let number = number
                    .parse::<u64>()
                    .map_err(|_| format!("flow has non-integer number '{number}'"))?;
                let type_index = vehicle_type
                    .and_then(|vt| vehicle_types.iter().position(|known| *known == vt));
                flows.push(FlowEntry { type_index, number });
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(flows)
}

/// Copy the document, replacing the `number` of the i-th flow with
/// `numbers[i]`
fn rewrite_numbers(content: &str, numbers: &[u64]) -> Result<String, quick_xml::Error> {
    let mut reader = Reader::from_str(content);
    let mut writer = Writer::new(Vec::new());
    let mut next = numbers.iter();

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"flow" => {
                let number = next.next().copied().unwrap_or(0);
                writer.write_event(Event::Start(with_number(&e, number)?))?;
            }
            Event::Empty(e) if e.name().as_ref() == b"flow" => {
                let number = next.next().copied().unwrap_or(0);
                writer.write_event(Event::Empty(with_number(&e, number)?))?;
            }
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
    }

    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}

fn with_number(element: &BytesStart<'_>, number: u64) -> Result<BytesStart<'static>, quick_xml::Error> {
    let number = number.to_string();
    let mut rewritten = BytesStart::new(element_name(element));
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == b"number" {
            rewritten.push_attribute(("number", number.as_str()));
        } else {
            rewritten.push_attribute(attr);
        }
    }
    Ok(rewritten.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::normalize;
    use crate::files::parse_routes;

    const ROUTES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<routes>
    <vType id="pkw" accel="2.6"/>
    <flow id="pkw0" type="pkw" begin="0" end="500" number="30" from="E0" to="E1"/>
    <flow id="pkw1" type="pkw" begin="0" end="500" number="10" from="E1" to="E2"/>
    <flow id="bus0" type="bus" begin="0" end="500" number="10" from="E0" to="E2"/>
    <flow id="bike0" type="bike" begin="0" end="500" number="50" from="E2" to="E0"/>
    <flow id="tram0" type="tram" begin="0" end="500" number="7" from="E2" to="E0"/>
</routes>"#;

    fn types() -> Vec<String> {
        ["pkw", "bus", "bike"].map(String::from).to_vec()
    }

    fn numbers(content: &str) -> Vec<u64> {
        let mut reader = Reader::from_str(content);
        let mut out = Vec::new();
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"flow" => {
                    out.push(attribute(&e, "number").unwrap().unwrap().parse().unwrap());
                }
                Event::Eof => break,
                _ => {}
            }
        }
        out
    }

    #[test]
    fn totals_follow_new_mix() {
        let mix = normalize(&[50.0, 25.0, 25.0]).unwrap();
        let result = rescale_flows(ROUTES, Path::new("base.rou.xml"), &types(), &mix).unwrap();

        assert_eq!(result.allocation.as_slice(), &[50, 25, 25]);
        // pkw split 3:1, unknown tram flow untouched
        assert_eq!(numbers(&result.content), vec![38, 12, 25, 25, 7]);
        assert_eq!(result.allocation.total(), 100);
    }

    #[test]
    fn other_content_passes_through() {
        let mix = normalize(&[1.0, 1.0, 1.0]).unwrap();
        let result = rescale_flows(ROUTES, Path::new("base.rou.xml"), &types(), &mix).unwrap();
        assert!(result.content.contains(r#"<vType id="pkw" accel="2.6"/>"#));
        assert!(parse_routes(&result.content).unwrap().is_empty());
    }

    #[test]
    fn template_total_counts_known_types_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("base.rou.xml");
        std::fs::write(&path, ROUTES).unwrap();
        let template = FlowTemplate::load(&path).unwrap();
        assert_eq!(template.total(&types()).unwrap(), 100);

        let mix = normalize(&[1.0, 0.0, 0.0]).unwrap();
        let result = template.rescale(&types(), &mix).unwrap();
        assert_eq!(numbers(&result.content), vec![75, 25, 0, 0, 7]);
    }

    #[test]
    fn type_without_flows_is_an_error() {
        let types = ["pkw", "scooter"].map(String::from).to_vec();
        let mix = normalize(&[0.5, 0.5]).unwrap();
        let err = rescale_flows(ROUTES, Path::new("base.rou.xml"), &types, &mix).unwrap_err();
        assert!(matches!(err, XmlFileError::NoFlowsForType { vehicle_type, .. } if vehicle_type == "scooter"));
    }
}

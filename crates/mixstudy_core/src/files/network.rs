use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use rustc_hash::FxHashSet;

use crate::error::XmlFileError;

use super::{attribute, malformed, read_text};

/// Enumerate the routable edge ids of a network file
pub fn load_edges(path: &Path) -> Result<Vec<String>, XmlFileError> {
    let content = read_text(path)?;
    let edges = parse_edges(&content).map_err(|e| malformed(path, e))?;
    tracing::debug!(path = %path.display(), edges = edges.len(), "loaded network edges");
    Ok(edges)
}

/// Top-level `<edge>` ids in document order, without duplicates.
/// Junction-internal edges (id prefixed with `:` or `function="internal"`)
/// are excluded.
pub fn parse_edges(content: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut edges = Vec::new();
    let mut seen = FxHashSet::default();
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if depth == 1 {
                    collect_edge(&e, &mut edges, &mut seen)?;
                }
                depth += 1;
            }
            Event::Empty(e) => {
                if depth == 1 {
                    collect_edge(&e, &mut edges, &mut seen)?;
                }
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(edges)
}

fn collect_edge(
    element: &BytesStart<'_>,
    edges: &mut Vec<String>,
    seen: &mut FxHashSet<String>,
) -> Result<(), quick_xml::Error> {
    if element.name().as_ref() != b"edge" {
        return Ok(());
    }
    let Some(id) = attribute(element, "id")? else {
        return Ok(());
    };
    if id.starts_with(':') || attribute(element, "function")?.as_deref() == Some("internal") {
        return Ok(());
    }
    if seen.insert(id.clone()) {
        edges.push(id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<net version="1.16">
    <location netOffset="0.00,0.00"/>
    <edge id=":J1_0" function="internal">
        <lane id=":J1_0_0" index="0" speed="13.89" length="5.00"/>
    </edge>
    <edge id="E0" from="J0" to="J1" priority="-1">
        <lane id="E0_0" index="0" speed="13.89" length="100.00"/>
    </edge>
    <edge id="E1" from="J1" to="J2"/>
    <edge id="weird" function="internal"/>
    <edge id="-E0" from="J1" to="J0">
        <lane id="-E0_0" index="0" speed="13.89" length="100.00"/>
    </edge>
    <junction id="J1" type="priority"/>
</net>"#;

    #[test]
    fn internal_edges_are_skipped() {
        let edges = parse_edges(NET).unwrap();
        assert_eq!(edges, vec!["E0", "E1", "-E0"]);
    }

    #[test]
    fn nested_edge_elements_are_ignored() {
        let net = r#"<net><roundabout><edge id="nested"/></roundabout><edge id="A"/><edge id="A"/></net>"#;
        assert_eq!(parse_edges(net).unwrap(), vec!["A"]);
    }
}

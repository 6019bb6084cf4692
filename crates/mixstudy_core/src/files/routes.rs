use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::error::XmlFileError;
use crate::model::{Trip, TripSet};

use super::{attribute, malformed, read_text, write_text};

/// Serialize trips as a `<routes>` document, one `<trip>` per entry
pub fn render_routes(trips: &TripSet) -> Result<Vec<u8>, quick_xml::Error> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("routes")))?;

    for trip in trips {
        let depart = format!("{:.2}", trip.depart);
        let mut element = BytesStart::new("trip");
        element.push_attribute(("id", trip.id.as_str()));
        element.push_attribute(("type", trip.vehicle_type.as_str()));
        element.push_attribute(("depart", depart.as_str()));
        element.push_attribute(("from", trip.from.as_str()));
        element.push_attribute(("to", trip.to.as_str()));
        writer.write_event(Event::Empty(element))?;
    }

    writer.write_event(Event::End(BytesEnd::new("routes")))?;
    Ok(writer.into_inner())
}

pub fn write_route_file(path: &Path, trips: &TripSet) -> Result<(), XmlFileError> {
    let content = render_routes(trips).map_err(|e| malformed(path, e))?;
    write_text(path, &content)?;
    tracing::debug!(path = %path.display(), trips = trips.len(), "wrote route file");
    Ok(())
}

pub fn read_route_file(path: &Path) -> Result<TripSet, XmlFileError> {
    let content = read_text(path)?;
    parse_routes(&content).map_err(|reason| malformed(path, reason))
}

/// Parse the `<trip>` entries of a route document. Other route elements
/// (vehicle types, flows, explicit vehicles) are ignored.
pub fn parse_routes(content: &str) -> Result<TripSet, String> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut trips = Vec::new();
    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"trip" => {
                trips.push(parse_trip(&e)?);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(TripSet::from_unsorted(trips))
}

fn parse_trip(element: &BytesStart<'_>) -> Result<Trip, String> {
    let required = |name: &str| -> Result<String, String> {
        attribute(element, name)
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("trip is missing the '{name}' attribute"))
    };

    let id = required("id")?;
    let depart = required("depart")?;
    let depart = depart
        .parse::<f64>()
        .map_err(|_| format!("trip '{id}' has non-numeric depart '{depart}'"))?;

    Ok(Trip {
        vehicle_type: required("type")?,
        depart,
        from: required("from")?,
        to: required("to")?,
        id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip(id: &str, depart: f64) -> Trip {
        Trip {
            id: id.to_string(),
            vehicle_type: "bus".to_string(),
            depart,
            from: "E0".to_string(),
            to: "E1".to_string(),
        }
    }

    #[test]
    fn written_routes_parse_back_in_order() {
        let trips = TripSet::from_unsorted(vec![trip("bus_1", 12.5), trip("bus_0", 3.25)]);
        let xml = String::from_utf8(render_routes(&trips).unwrap()).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains(r#"<trip id="bus_0" type="bus" depart="3.25" from="E0" to="E1"/>"#));

        let parsed = parse_routes(&xml).unwrap();
        let ids: Vec<&str> = parsed.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["bus_0", "bus_1"]);
    }

    #[test]
    fn trip_without_destination_is_rejected() {
        let xml = r#"<routes><trip id="a" type="car" depart="0" from="E0"/></routes>"#;
        let err = parse_routes(xml).unwrap_err();
        assert!(err.contains("'to'"), "{err}");
    }

    #[test]
    fn non_trip_elements_are_ignored() {
        let xml = r#"<routes>
            <vType id="car" accel="2.6"/>
            <flow id="f0" type="car" begin="0" end="100" number="5" from="E0" to="E1"/>
            <trip id="t0" type="car" depart="1.00" from="E0" to="E1"/>
        </routes>"#;
        assert_eq!(parse_routes(xml).unwrap().len(), 1);
    }
}

use std::fs;

use camino::Utf8Path;
use geo::{Centroid, Contains, LineString, Point, Polygon};
use regex::Regex;

use crate::error::DatapointsError;

const MEMBER_PATTERN: &str =
    r"(?s)<(?:gml:featureMember|wfs:member)>(.*?)</(?:gml:featureMember|wfs:member)>";
const INSPIRE_ID_PATTERN: &str = r"<(?:\w+:)?INSPIREID>\s*([^<]*?)\s*</";
const EXTERIOR_PATTERN: &str = r"(?s)<gml:exterior>.*?<gml:posList[^>]*>([^<]*)</gml:posList>";
const INTERIOR_PATTERN: &str = r"(?s)<gml:interior>.*?<gml:posList[^>]*>([^<]*)</gml:posList>";

/// One cadastral parcel from an index polygon file.
#[derive(Debug, Clone, PartialEq)]
pub struct Parcel {
    pub inspire_id: String,
    pub polygon: Polygon<f64>,
}

pub fn read_parcels(path: &Utf8Path) -> Result<Vec<Parcel>, DatapointsError> {
    let text = fs::read_to_string(path.as_std_path())
        .map_err(|err| DatapointsError::Filesystem(format!("read {path}: {err}")))?;
    parse_parcels(&text)
}

/// Extracts parcels from GML text. Members without an exterior ring are skipped.
pub fn parse_parcels(gml: &str) -> Result<Vec<Parcel>, DatapointsError> {
    let member_re = compile(MEMBER_PATTERN)?;
    let id_re = compile(INSPIRE_ID_PATTERN)?;
    let exterior_re = compile(EXTERIOR_PATTERN)?;
    let interior_re = compile(INTERIOR_PATTERN)?;

    let mut parcels = Vec::new();
    for member in member_re.captures_iter(gml).filter_map(|caps| caps.get(1)) {
        let member = member.as_str();
        let Some(exterior) = exterior_re.captures(member).and_then(|caps| caps.get(1)) else {
            continue;
        };
        let inspire_id = id_re
            .captures(member)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let interiors = interior_re
            .captures_iter(member)
            .filter_map(|caps| caps.get(1))
            .map(|m| parse_ring(m.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        parcels.push(Parcel {
            polygon: Polygon::new(parse_ring(exterior.as_str())?, interiors),
            inspire_id,
        });
    }
    Ok(parcels)
}

fn parse_ring(pos_list: &str) -> Result<LineString<f64>, DatapointsError> {
    let values = pos_list
        .split_whitespace()
        .map(|value| {
            value
                .parse::<f64>()
                .map_err(|_| DatapointsError::Geometry(format!("bad coordinate {value:?}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if !values.len().is_multiple_of(2) || values.len() < 6 {
        return Err(DatapointsError::Geometry(format!(
            "ring needs at least three x y pairs, got {} values",
            values.len()
        )));
    }
    Ok(LineString::from(
        values
            .chunks_exact(2)
            .map(|pair| (pair[0], pair[1]))
            .collect::<Vec<_>>(),
    ))
}

fn compile(pattern: &str) -> Result<Regex, DatapointsError> {
    Regex::new(pattern).map_err(|err| DatapointsError::Geometry(err.to_string()))
}

/// Index of the first parcel whose polygon contains `(x, y)`.
pub fn locate(parcels: &[Parcel], x: f64, y: f64) -> Option<usize> {
    let point = Point::new(x, y);
    parcels
        .iter()
        .position(|parcel| parcel.polygon.contains(&point))
}

/// Where a label for `parcel` should point: its centroid.
pub fn anchor(parcel: &Parcel) -> Option<(f64, f64)> {
    parcel.polygon.centroid().map(|point| (point.x(), point.y()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_rejects_odd_values() {
        assert!(parse_ring("0 0 1 1 2").is_err());
        assert!(parse_ring("0 0 1").is_err());
    }

    #[test]
    fn ring_from_pos_list() {
        let ring = parse_ring("0 0 4 0 4 4 0 4 0 0").unwrap();
        assert_eq!(ring.0.len(), 5);
    }
}

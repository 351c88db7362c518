use std::{string::String, vec::Vec};

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};
use serde::Serialize;

use crate::{
    protocol::{Report, TagData},
    query::LocatedReport,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Line<'a> {
    tag_data: &'a TagData,
    report: &'a Report,
}

/// One `{"tagData": ..., "report": ...}` object per line.
pub fn json_lines(reports: &[LocatedReport]) -> Result<String, serde_json::Error> {
    let mut out = String::new();

    for located in reports {
        out.push_str(&serde_json::to_string(&Line {
            tag_data: &located.tag_data,
            report: &located.report,
        })?);
        out.push('\n');
    }

    Ok(out)
}

/// A point feature per report. Properties carry the tag data and the owning key.
pub fn feature_collection(reports: &[LocatedReport]) -> Result<FeatureCollection, serde_json::Error> {
    let features = reports
        .iter()
        .map(feature)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

fn feature(located: &LocatedReport) -> Result<Feature, serde_json::Error> {
    let tag_data = &located.tag_data;

    let mut properties = JsonObject::new();
    properties.insert("time".into(), serde_json::to_value(tag_data.time)?);
    properties.insert("confidence".into(), JsonValue::from(tag_data.confidence));
    properties.insert("status".into(), JsonValue::from(tag_data.status));
    properties.insert("keyId".into(), JsonValue::from(located.key_id.as_str()));
    properties.insert("kind".into(), serde_json::to_value(located.kind)?);

    Ok(Feature {
        bbox: None,
        // GeoJSON positions are longitude first
        geometry: Some(Geometry::new(geojson::Value::Point(vec![
            tag_data.lng,
            tag_data.lat,
        ]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    })
}

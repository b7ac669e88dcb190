//! Site locations as GeoJSON for the map view.

use monitor_common::{MonitorError, MonitorResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::table::{parse_number, Table};

/// Column names used as the feature id, in priority order.
const ID_COLUMNS: &[&str] = &["site", "station", "site_id", "name"];

/// A GeoJSON FeatureCollection of monitoring sites.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteCollection {
    /// Type identifier (always "FeatureCollection").
    #[serde(rename = "type")]
    pub type_: String,

    pub features: Vec<SiteFeature>,

    /// Rows dropped for missing or out-of-range coordinates.
    pub skipped: usize,
}

/// A single site as a GeoJSON Point feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteFeature {
    /// Type identifier (always "Feature").
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub geometry: PointGeometry,

    pub properties: Map<String, Value>,
}

/// GeoJSON Point geometry, `[lon, lat]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PointGeometry {
    #[serde(rename = "type")]
    pub type_: String,
    pub coordinates: [f64; 2],
}

impl PointGeometry {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self {
            type_: "Point".to_string(),
            coordinates: [lon, lat],
        }
    }
}

/// Build a FeatureCollection from a table with latitude/longitude columns.
///
/// Latitude must lie in [-90, 90] and longitude in [-180, 360]; other rows
/// are counted in `skipped`. Remaining columns become string properties.
pub fn sites_geojson(table: &Table) -> MonitorResult<SiteCollection> {
    let lat_idx = table
        .latitude_column()
        .ok_or_else(|| MonitorError::ColumnNotFound("latitude".to_string()))?;
    let lon_idx = table
        .longitude_column()
        .ok_or_else(|| MonitorError::ColumnNotFound("longitude".to_string()))?;
    let id_idx = table.find_column(ID_COLUMNS);

    let mut features = Vec::with_capacity(table.row_count());
    let mut skipped = 0;

    for row in &table.rows {
        let lat = parse_number(&row[lat_idx]).filter(|v| (-90.0..=90.0).contains(v));
        let lon = parse_number(&row[lon_idx]).filter(|v| (-180.0..=360.0).contains(v));
        let (Some(lat), Some(lon)) = (lat, lon) else {
            skipped += 1;
            continue;
        };

        let properties = table
            .headers
            .iter()
            .zip(row)
            .enumerate()
            .filter(|(i, _)| *i != lat_idx && *i != lon_idx)
            .map(|(_, (name, cell))| (name.clone(), Value::String(cell.clone())))
            .collect();

        features.push(SiteFeature {
            type_: "Feature".to_string(),
            id: id_idx
                .map(|i| row[i].clone())
                .filter(|id| !id.is_empty()),
            geometry: PointGeometry::new(lon, lat),
            properties,
        });
    }

    Ok(SiteCollection {
        type_: "FeatureCollection".to_string(),
        features,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[[&str; 3]]) -> Table {
        Table::new(
            vec!["station".into(), "lat".into(), "lon".into()],
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_out_of_range_rows_are_skipped() {
        let t = table(&[["A", "10", "20"], ["B", "95", "20"], ["C", "10", "-200"], ["D", "x", "1"]]);
        let sites = sites_geojson(&t).unwrap();
        assert_eq!(sites.features.len(), 1);
        assert_eq!(sites.skipped, 3);
        assert_eq!(sites.features[0].id.as_deref(), Some("A"));
        assert_eq!(sites.features[0].geometry.coordinates, [20.0, 10.0]);
    }

    #[test]
    fn test_coordinates_excluded_from_properties() {
        let sites = sites_geojson(&table(&[["A", "1", "2"]])).unwrap();
        let props = &sites.features[0].properties;
        assert_eq!(props.len(), 1);
        assert_eq!(props["station"], Value::String("A".into()));
    }

    #[test]
    fn test_missing_longitude_column() {
        let t = Table::new(vec!["lat".into()], vec![vec!["1".into()]]);
        let err = sites_geojson(&t).unwrap_err();
        assert!(matches!(err, MonitorError::ColumnNotFound(ref c) if c == "longitude"));
    }

    #[test]
    fn test_serializes_as_geojson() {
        let sites = sites_geojson(&table(&[["A", "1", "2"]])).unwrap();
        let json = serde_json::to_value(&sites).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"][0]["type"], "Feature");
        assert_eq!(json["features"][0]["geometry"]["type"], "Point");
    }
}

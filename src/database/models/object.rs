use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use crate::types::mandant_ids_from_json;

pub const OBJECT_COLUMNS: &str = "id, objectid, name, object_type, status, postal_code, city, country, \
     latitude, longitude, description, objdata, objanlage, portdata, meter, dashboard, alarm, \
     kianalyse, statusdata, auswertung, report, diagramm, fltemp, rttemp, energy, \
     temperatur_grenzwert, mandant_access, mandant_id, created_at, updated_at";

/// A monitored building / heating installation
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PortalObject {
    pub id: i32,
    pub objectid: i64,
    pub name: String,
    pub object_type: Option<String>,
    pub status: String,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub description: Option<String>,
    pub objdata: Option<Value>,
    pub objanlage: Option<Value>,
    pub portdata: Option<Value>,
    pub meter: Option<Value>,
    pub dashboard: Option<Value>,
    pub alarm: Option<Value>,
    pub kianalyse: Option<Value>,
    pub statusdata: Option<Value>,
    pub auswertung: Option<Value>,
    pub report: Option<Value>,
    pub diagramm: Option<Value>,
    pub fltemp: Option<Value>,
    pub rttemp: Option<Value>,
    pub energy: Option<Value>,
    pub temperatur_grenzwert: Option<String>,
    pub mandant_access: Value,
    pub mandant_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PortalObject {
    pub fn mandant_access_ids(&self) -> Vec<i32> {
        mandant_ids_from_json(Some(&self.mandant_access))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    BigInt,
    Int,
    Float,
    Json,
}

/// Mapping between an API field and a writable `objects` column
#[derive(Debug)]
pub struct ObjectColumn {
    pub field: &'static str,
    pub column: &'static str,
    pub kind: ColumnKind,
}

const fn col(field: &'static str, column: &'static str, kind: ColumnKind) -> ObjectColumn {
    ObjectColumn { field, column, kind }
}

pub const WRITABLE_COLUMNS: &[ObjectColumn] = &[
    col("objectid", "objectid", ColumnKind::BigInt),
    col("name", "name", ColumnKind::Text),
    col("objectType", "object_type", ColumnKind::Text),
    col("status", "status", ColumnKind::Text),
    col("postalCode", "postal_code", ColumnKind::Text),
    col("city", "city", ColumnKind::Text),
    col("country", "country", ColumnKind::Text),
    col("latitude", "latitude", ColumnKind::Float),
    col("longitude", "longitude", ColumnKind::Float),
    col("description", "description", ColumnKind::Text),
    col("objdata", "objdata", ColumnKind::Json),
    col("objanlage", "objanlage", ColumnKind::Json),
    col("portdata", "portdata", ColumnKind::Json),
    col("meter", "meter", ColumnKind::Json),
    col("dashboard", "dashboard", ColumnKind::Json),
    col("alarm", "alarm", ColumnKind::Json),
    col("kianalyse", "kianalyse", ColumnKind::Json),
    col("statusdata", "statusdata", ColumnKind::Json),
    col("auswertung", "auswertung", ColumnKind::Json),
    col("report", "report", ColumnKind::Json),
    col("diagramm", "diagramm", ColumnKind::Json),
    col("fltemp", "fltemp", ColumnKind::Json),
    col("rttemp", "rttemp", ColumnKind::Json),
    col("energy", "energy", ColumnKind::Json),
    col("temperaturGrenzwert", "temperatur_grenzwert", ColumnKind::Text),
    col("mandantAccess", "mandant_access", ColumnKind::Json),
    col("mandantId", "mandant_id", ColumnKind::Int),
];

/// Look up a writable column by camelCase field or snake_case column name
pub fn writable_column(name: &str) -> Option<&'static ObjectColumn> {
    WRITABLE_COLUMNS
        .iter()
        .find(|c| c.field == name || c.column == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_both_naming_styles() {
        assert_eq!(writable_column("postalCode").map(|c| c.column), Some("postal_code"));
        assert_eq!(writable_column("postal_code").map(|c| c.column), Some("postal_code"));
        assert_eq!(writable_column("mandantId").map(|c| c.kind), Some(ColumnKind::Int));
    }

    #[test]
    fn system_columns_are_not_writable() {
        for name in ["id", "createdAt", "created_at", "updated_at"] {
            assert!(writable_column(name).is_none(), "{} must not be writable", name);
        }
    }
}

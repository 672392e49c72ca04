use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

use super::error::{ServiceError, ServiceResult};
use crate::auth::SessionUser;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::object::{writable_column, ColumnKind, ObjectColumn, OBJECT_COLUMNS};
use crate::database::models::PortalObject;
use crate::monitoring::telemetry::number_from_json;
use crate::types::{MandantScope, Role};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectFilter {
    pub status: Option<String>,
    pub city: Option<String>,
    #[serde(alias = "postal_code")]
    pub postal_code: Option<String>,
    #[serde(alias = "object_type")]
    pub object_type: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn validate(&self) -> ServiceResult<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ServiceError::field("latitude", "latitude must be between -90 and 90"));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ServiceError::field("longitude", "longitude must be between -180 and 180"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ObjectMeter {
    pub objectid: i64,
    pub meter: Option<Value>,
    pub report: Option<Value>,
}

/// A typed value for one writable column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Text(Option<String>),
    BigInt(Option<i64>),
    Int(Option<i32>),
    Float(Option<f64>),
    Json(Option<Value>),
}

impl ColumnValue {
    fn parse(column: &ObjectColumn, value: &Value) -> ServiceResult<Self> {
        let invalid = |expected: &str| ServiceError::field(column.field, format!("{} must be {}", column.field, expected));
        if value.is_null() {
            return match column.kind {
                ColumnKind::Json if column.column == "mandant_access" => Ok(ColumnValue::Json(Some(Value::Array(Vec::new())))),
                ColumnKind::BigInt => Err(invalid("a number")),
                ColumnKind::Text => Ok(ColumnValue::Text(None)),
                ColumnKind::Int => Ok(ColumnValue::Int(None)),
                ColumnKind::Float => Ok(ColumnValue::Float(None)),
                ColumnKind::Json => Ok(ColumnValue::Json(None)),
            };
        }

        match column.kind {
            ColumnKind::Text => match value {
                Value::String(s) => Ok(ColumnValue::Text(Some(s.clone()))),
                Value::Number(n) => Ok(ColumnValue::Text(Some(n.to_string()))),
                _ => Err(invalid("a string")),
            },
            ColumnKind::BigInt => integer(value)
                .map(|v| ColumnValue::BigInt(Some(v)))
                .ok_or_else(|| invalid("an integer")),
            ColumnKind::Int => integer(value)
                .and_then(|v| i32::try_from(v).ok())
                .map(|v| ColumnValue::Int(Some(v)))
                .ok_or_else(|| invalid("an integer")),
            ColumnKind::Float => number_from_json(value)
                .map(|v| ColumnValue::Float(Some(v)))
                .ok_or_else(|| invalid("a number")),
            ColumnKind::Json => Ok(ColumnValue::Json(Some(value.clone()))),
        }
    }

    fn push_bind(self, builder: &mut QueryBuilder<'_, Postgres>) {
        match self {
            ColumnValue::Text(v) => builder.push_bind(v),
            ColumnValue::BigInt(v) => builder.push_bind(v),
            ColumnValue::Int(v) => builder.push_bind(v),
            ColumnValue::Float(v) => builder.push_bind(v),
            ColumnValue::Json(v) => builder.push_bind(v),
        };
    }
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub type ObjectFields = Vec<(&'static ObjectColumn, ColumnValue)>;

/// Map a JSON body onto writable columns. Unknown or system fields are rejected.
pub fn parse_object_fields(body: &Map<String, Value>) -> ServiceResult<ObjectFields> {
    let mut fields: ObjectFields = Vec::with_capacity(body.len());
    for (name, value) in body {
        let column = writable_column(name)
            .ok_or_else(|| ServiceError::field(name, format!("{} is not a writable object field", name)))?;
        if fields.iter().any(|(c, _)| c.column == column.column) {
            return Err(ServiceError::field(name, format!("{} given twice", column.column)));
        }
        fields.push((column, ColumnValue::parse(column, value)?));
    }
    Ok(fields)
}

fn field_value<'a>(fields: &'a ObjectFields, column: &str) -> Option<&'a ColumnValue> {
    fields.iter().find(|(c, _)| c.column == column).map(|(_, v)| v)
}

/// Validate a create body and default the mandant to the creator's own
pub fn prepare_new_object(body: &Map<String, Value>, creator: &SessionUser) -> ServiceResult<ObjectFields> {
    let mut fields = parse_object_fields(body)?;

    match field_value(&fields, "name") {
        Some(ColumnValue::Text(Some(name))) if !name.trim().is_empty() => {}
        _ => return Err(ServiceError::field("name", "name is required")),
    }
    if !matches!(field_value(&fields, "objectid"), Some(ColumnValue::BigInt(Some(_)))) {
        return Err(ServiceError::field("objectid", "objectid is required"));
    }
    if field_value(&fields, "mandant_id").is_none() {
        if let (Some(mandant_id), Some(column)) = (creator.mandant_id, writable_column("mandant_id")) {
            fields.push((column, ColumnValue::Int(Some(mandant_id))));
        }
    }
    Ok(fields)
}

/// `mandant_id` in scope, or any overlap with `mandant_access`
fn push_scope(builder: &mut QueryBuilder<'_, Postgres>, scope: &MandantScope) {
    if let MandantScope::Only(ids) = scope {
        let as_text: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        builder
            .push(" AND (mandant_id = ANY(")
            .push_bind(ids.clone())
            .push(") OR (jsonb_typeof(mandant_access) = 'array' AND EXISTS (SELECT 1 FROM jsonb_array_elements_text(mandant_access) AS granted(id) WHERE granted.id = ANY(")
            .push_bind(as_text)
            .push("))))");
    }
}

fn conflict_on_unique(err: sqlx::Error, message: String) -> ServiceError {
    let err = DatabaseError::Sqlx(err);
    if err.is_unique_violation() {
        ServiceError::Conflict(message)
    } else {
        ServiceError::Database(err)
    }
}

pub struct ObjectService {
    pool: PgPool,
}

impl ObjectService {
    pub async fn new() -> ServiceResult<Self> {
        let pool = DatabaseManager::main_pool().await?;
        Ok(Self { pool })
    }

    fn select() -> QueryBuilder<'static, Postgres> {
        QueryBuilder::new(format!("SELECT {} FROM objects WHERE 1=1", OBJECT_COLUMNS))
    }

    pub async fn list(&self, filter: &ObjectFilter, scope: &MandantScope) -> ServiceResult<Vec<PortalObject>> {
        let mut builder = Self::select();
        if let Some(status) = &filter.status {
            builder.push(" AND status = ").push_bind(status.clone());
        }
        if let Some(city) = &filter.city {
            builder.push(" AND city = ").push_bind(city.clone());
        }
        if let Some(postal_code) = &filter.postal_code {
            builder.push(" AND postal_code = ").push_bind(postal_code.clone());
        }
        if let Some(object_type) = &filter.object_type {
            builder.push(" AND object_type = ").push_bind(object_type.clone());
        }
        push_scope(&mut builder, scope);
        builder.push(" ORDER BY name");
        Ok(builder.build_query_as::<PortalObject>().fetch_all(&self.pool).await?)
    }

    /// Every object in scope, for classification
    pub async fn visible(&self, scope: &MandantScope) -> ServiceResult<Vec<PortalObject>> {
        self.list(&ObjectFilter::default(), scope).await
    }

    pub async fn get(&self, id: i32, scope: &MandantScope) -> ServiceResult<PortalObject> {
        let mut builder = Self::select();
        builder.push(" AND id = ").push_bind(id);
        push_scope(&mut builder, scope);
        builder
            .build_query_as::<PortalObject>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Object {} not found", id)))
    }

    pub async fn by_objectid(&self, objectid: i64, scope: &MandantScope) -> ServiceResult<PortalObject> {
        let mut builder = Self::select();
        builder.push(" AND objectid = ").push_bind(objectid);
        push_scope(&mut builder, scope);
        builder
            .build_query_as::<PortalObject>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Object with objectid {} not found", objectid)))
    }

    pub async fn meter_by_objectid(&self, objectid: i64, scope: &MandantScope) -> ServiceResult<ObjectMeter> {
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT objectid, meter, COALESCE(report, '{}'::jsonb) AS report FROM objects WHERE objectid = ",
        );
        builder.push_bind(objectid);
        push_scope(&mut builder, scope);
        builder
            .build_query_as::<ObjectMeter>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Object with objectid {} not found", objectid)))
    }

    pub async fn hierarchy(&self, mandant_id: i32, scope: &MandantScope) -> ServiceResult<Vec<PortalObject>> {
        if !scope.allows(Some(mandant_id)) {
            return Err(ServiceError::Forbidden(format!("No access to mandant {}", mandant_id)));
        }
        let mut builder = Self::select();
        builder.push(" AND mandant_id = ").push_bind(mandant_id);
        builder.push(" ORDER BY name");
        Ok(builder.build_query_as::<PortalObject>().fetch_all(&self.pool).await?)
    }

    /// Objects whose `objdata.parent` names this object's objectid
    pub async fn children(&self, id: i32, scope: &MandantScope) -> ServiceResult<Vec<PortalObject>> {
        let parent = self.get(id, scope).await?;
        let mut builder = Self::select();
        builder
            .push(" AND objdata->>'parent' = ")
            .push_bind(parent.objectid.to_string());
        push_scope(&mut builder, scope);
        builder.push(" ORDER BY name");
        Ok(builder.build_query_as::<PortalObject>().fetch_all(&self.pool).await?)
    }

    pub async fn create(&self, body: &Map<String, Value>, creator: &SessionUser) -> ServiceResult<PortalObject> {
        let fields = prepare_new_object(body, creator)?;
        let objectid = match field_value(&fields, "objectid") {
            Some(ColumnValue::BigInt(Some(v))) => *v,
            _ => 0,
        };

        let columns: Vec<&str> = fields.iter().map(|(c, _)| c.column).collect();
        let mut builder = QueryBuilder::<Postgres>::new(format!("INSERT INTO objects ({}) VALUES (", columns.join(", ")));
        for (i, (_, value)) in fields.into_iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            value.push_bind(&mut builder);
        }
        builder.push(format!(") RETURNING {}", OBJECT_COLUMNS));

        let created = builder
            .build_query_as::<PortalObject>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, format!("Object with objectid {} already exists", objectid)))?;
        info!("{} created object {} (objectid={})", creator.username, created.id, created.objectid);
        Ok(created)
    }

    pub async fn update(&self, id: i32, body: &Map<String, Value>, scope: &MandantScope) -> ServiceResult<PortalObject> {
        let fields = parse_object_fields(body)?;
        if fields.is_empty() {
            return self.get(id, scope).await;
        }
        if matches!(field_value(&fields, "name"), Some(ColumnValue::Text(None))) {
            return Err(ServiceError::field("name", "name must not be empty"));
        }
        self.write(id, fields, scope).await
    }

    pub async fn update_coordinates(&self, id: i32, coordinates: Coordinates, scope: &MandantScope) -> ServiceResult<PortalObject> {
        coordinates.validate()?;
        let fields = vec![
            (column("latitude")?, ColumnValue::Float(Some(coordinates.latitude))),
            (column("longitude")?, ColumnValue::Float(Some(coordinates.longitude))),
        ];
        self.write(id, fields, scope).await
    }

    pub async fn update_meter(&self, id: i32, meter: Value, scope: &MandantScope) -> ServiceResult<PortalObject> {
        if !meter.is_object() {
            return Err(ServiceError::field("meter", "meter must be a JSON object"));
        }
        self.write(id, vec![(column("meter")?, ColumnValue::Json(Some(meter)))], scope).await
    }

    async fn write(&self, id: i32, fields: ObjectFields, scope: &MandantScope) -> ServiceResult<PortalObject> {
        let objectid = match field_value(&fields, "objectid") {
            Some(ColumnValue::BigInt(Some(v))) => Some(*v),
            _ => None,
        };

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE objects SET ");
        for (column, value) in fields {
            builder.push(column.column).push(" = ");
            value.push_bind(&mut builder);
            builder.push(", ");
        }
        builder.push("updated_at = now() WHERE id = ").push_bind(id);
        push_scope(&mut builder, scope);
        builder.push(format!(" RETURNING {}", OBJECT_COLUMNS));

        builder
            .build_query_as::<PortalObject>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                conflict_on_unique(
                    e,
                    format!("Object with objectid {} already exists", objectid.unwrap_or_default()),
                )
            })?
            .ok_or_else(|| ServiceError::NotFound(format!("Object {} not found", id)))
    }

    /// Superadmins delete anything; admins only objects of their own mandant
    pub async fn delete(&self, id: i32, actor: &SessionUser) -> ServiceResult<()> {
        let object = self.get(id, &MandantScope::All).await?;
        if actor.role != Role::Superadmin && object.mandant_id != actor.mandant_id {
            return Err(ServiceError::Forbidden(
                "Objects can only be deleted within your own mandant".to_string(),
            ));
        }
        sqlx::query("DELETE FROM objects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        info!("{} deleted object {} (objectid={})", actor.username, id, object.objectid);
        Ok(())
    }
}

fn column(name: &str) -> ServiceResult<&'static ObjectColumn> {
    writable_column(name).ok_or_else(|| ServiceError::field(name, "unknown column"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::session_user;
    use serde_json::json;

    fn body(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test body must be an object"),
        }
    }

    #[test]
    fn parses_typed_columns() {
        let fields = parse_object_fields(&body(json!({
            "objectid": "1000123",
            "name": "Heizzentrale Nord",
            "latitude": "52,52",
            "mandantId": 3,
            "fltemp": {"1": 60.5}
        })))
        .unwrap();
        assert_eq!(field_value(&fields, "objectid"), Some(&ColumnValue::BigInt(Some(1000123))));
        assert_eq!(field_value(&fields, "latitude"), Some(&ColumnValue::Float(Some(52.52))));
        assert_eq!(field_value(&fields, "mandant_id"), Some(&ColumnValue::Int(Some(3))));
        assert_eq!(field_value(&fields, "fltemp"), Some(&ColumnValue::Json(Some(json!({"1": 60.5})))));
    }

    #[test]
    fn rejects_system_and_unknown_fields() {
        assert!(parse_object_fields(&body(json!({"id": 4}))).is_err());
        assert!(parse_object_fields(&body(json!({"createdAt": "2024-01-01"}))).is_err());
        assert!(parse_object_fields(&body(json!({"drop table": 1}))).is_err());
        assert!(parse_object_fields(&body(json!({"postalCode": "1", "postal_code": "2"}))).is_err());
    }

    #[test]
    fn null_mandant_access_becomes_empty_list() {
        let fields = parse_object_fields(&body(json!({"mandantAccess": null}))).unwrap();
        assert_eq!(field_value(&fields, "mandant_access"), Some(&ColumnValue::Json(Some(json!([])))));
    }

    #[test]
    fn create_requires_name_and_objectid() {
        let admin = session_user(Role::Admin, Some(7), vec![]);
        assert!(prepare_new_object(&body(json!({"objectid": 1})), &admin).is_err());
        assert!(prepare_new_object(&body(json!({"name": "A"})), &admin).is_err());
        assert!(prepare_new_object(&body(json!({"name": " ", "objectid": 1})), &admin).is_err());
    }

    #[test]
    fn create_defaults_to_creator_mandant() {
        let admin = session_user(Role::Admin, Some(7), vec![]);
        let fields = prepare_new_object(&body(json!({"name": "A", "objectid": 1})), &admin).unwrap();
        assert_eq!(field_value(&fields, "mandant_id"), Some(&ColumnValue::Int(Some(7))));

        let fields = prepare_new_object(&body(json!({"name": "A", "objectid": 1, "mandantId": 2})), &admin).unwrap();
        assert_eq!(field_value(&fields, "mandant_id"), Some(&ColumnValue::Int(Some(2))));
    }

    #[test]
    fn coordinates_are_range_checked() {
        assert!(Coordinates { latitude: 52.5, longitude: 13.4 }.validate().is_ok());
        assert!(Coordinates { latitude: 91.0, longitude: 13.4 }.validate().is_err());
        assert!(Coordinates { latitude: 0.0, longitude: -181.0 }.validate().is_err());
        assert!(Coordinates { latitude: f64::NAN, longitude: 0.0 }.validate().is_err());
    }
}

//! The typed table that flows from the loader through the exporter.
//!
//! A [`GeoTable`] is a list of declared [`Column`]s, one geometry slot per
//! row, and the [`Crs`] those geometries are expressed in. Column types are
//! fixed when the table is built; every pushed value is coerced to its
//! column's type.

use std::fmt;

use anyhow::anyhow;
use geo::CoordsIter;
use geo_types::Geometry;
use geojson::JsonValue;

use crate::crs::Crs;
use crate::error::Result;

/// A single attribute cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Convert a JSON property into a cell. Arrays and objects become text
    /// holding their compact JSON.
    #[must_use]
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Boolean(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => n.as_f64().map_or(Value::Null, Value::Float),
            },
            JsonValue::String(s) => Value::Text(s.clone()),
            JsonValue::Array(_) | JsonValue::Object(_) => Value::Text(value.to_string()),
        }
    }

    /// Numeric view of the cell, if it has one.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// The type this value would declare on its own; `None` for nulls.
    fn natural_type(&self) -> Option<ColumnType> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(ColumnType::Boolean),
            Value::Integer(_) => Some(ColumnType::Integer),
            Value::Float(_) => Some(ColumnType::Float),
            Value::Text(_) => Some(ColumnType::Text),
        }
    }

    /// Coerce to `column_type`. Nulls stay null.
    #[must_use]
    pub fn coerce(self, column_type: ColumnType) -> Self {
        match (self, column_type) {
            (Value::Null, _) => Value::Null,
            (Value::Integer(i), ColumnType::Float) => Value::Float(i as f64),
            (value @ Value::Boolean(_), ColumnType::Boolean)
            | (value @ Value::Integer(_), ColumnType::Integer)
            | (value @ Value::Float(_), ColumnType::Float)
            | (value @ Value::Text(_), ColumnType::Text) => value,
            (value, _) => Value::Text(value.to_string()),
        }
    }

    /// Text for a CSV cell; `None` for nulls.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        match self {
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    fn key_part(&self) -> KeyPart {
        match self {
            Value::Null => KeyPart::Null,
            Value::Boolean(b) => KeyPart::Boolean(*b),
            Value::Integer(i) => KeyPart::Integer(*i),
            Value::Float(f) => KeyPart::Float(float_bits(*f)),
            Value::Text(s) => KeyPart::Text(s.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Boolean(true) => f.write_str("True"),
            Value::Boolean(false) => f.write_str("False"),
            Value::Integer(i) => write!(f, "{i}"),
            // Debug keeps the trailing ".0" on integral floats
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Boolean,
    Integer,
    Float,
    Text,
}

impl ColumnType {
    /// Infer a column type from its values: integers mixed with floats widen
    /// to `Float`, any other mix (or no non-null value at all) is `Text`.
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        let mut inferred: Option<ColumnType> = None;
        for value in values {
            let Some(natural) = value.natural_type() else {
                continue;
            };
            inferred = Some(match inferred {
                None => natural,
                Some(current) if current == natural => current,
                Some(ColumnType::Integer | ColumnType::Float)
                    if matches!(natural, ColumnType::Integer | ColumnType::Float) =>
                {
                    ColumnType::Float
                },
                Some(_) => return ColumnType::Text,
            });
        }
        inferred.unwrap_or(ColumnType::Text)
    }
}

/// A named, typed attribute column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

impl Column {
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// One row: attribute values in column order plus the geometry slot.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoRow {
    pub values: Vec<Value>,
    pub geometry: Option<Geometry<f64>>,
}

impl GeoRow {
    /// Hashable identity of the row, geometry included.
    pub(crate) fn dedup_key(&self) -> RowKey {
        RowKey {
            values: self.values.iter().map(Value::key_part).collect(),
            geometry: self.geometry.as_ref().map(|geometry| {
                (
                    geometry_type_name(geometry),
                    geometry
                        .coords_iter()
                        .map(|c| (float_bits(c.x), float_bits(c.y)))
                        .collect(),
                )
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyPart {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(u64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct RowKey {
    values: Vec<KeyPart>,
    geometry: Option<(&'static str, Vec<(u64, u64)>)>,
}

fn float_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else if value.is_nan() {
        f64::NAN.to_bits()
    } else {
        value.to_bits()
    }
}

/// Name of the geometry's variant, as used in error messages.
#[must_use]
pub fn geometry_type_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// In-memory table of features: typed attribute columns plus geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoTable {
    columns: Vec<Column>,
    rows: Vec<GeoRow>,
    crs: Crs,
}

impl GeoTable {
    /// Empty table with the given columns.
    #[must_use]
    pub fn new(columns: Vec<Column>, crs: Crs) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            crs,
        }
    }

    /// Append a row, coercing each value to its column's type.
    ///
    /// # Errors
    ///
    /// Fails if the number of values differs from the number of columns.
    pub fn push_row(&mut self, values: Vec<Value>, geometry: Option<Geometry<f64>>) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(anyhow!(
                "row has {} values but the table has {} columns",
                values.len(),
                self.columns.len()
            )
            .into());
        }
        let values = values
            .into_iter()
            .zip(&self.columns)
            .map(|(value, column)| value.coerce(column.column_type))
            .collect();
        self.rows.push(GeoRow { values, geometry });
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    #[must_use]
    pub fn rows(&self) -> &[GeoRow] {
        &self.rows
    }

    #[must_use]
    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// Value at (`row`, `column`), if both exist.
    #[must_use]
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.values.get(idx))
    }

    /// Keep only rows for which `keep` returns `true`, preserving order.
    pub(crate) fn retain_rows(&mut self, keep: impl FnMut(&GeoRow) -> bool) {
        self.rows.retain(keep);
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [GeoRow] {
        &mut self.rows
    }

    pub(crate) fn set_crs(&mut self, crs: Crs) {
        self.crs = crs;
    }

    /// Add a column, or overwrite it in place if the name already exists.
    ///
    /// # Errors
    ///
    /// Fails if `values` does not have one entry per row.
    pub fn set_column(
        &mut self,
        name: &str,
        column_type: ColumnType,
        values: Vec<Value>,
    ) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(anyhow!(
                "column '{name}' has {} values but the table has {} rows",
                values.len(),
                self.rows.len()
            )
            .into());
        }

        let values = values.into_iter().map(|v| v.coerce(column_type));
        match self.column_index(name) {
            Some(idx) => {
                self.columns[idx].column_type = column_type;
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.values[idx] = value;
                }
            },
            None => {
                self.columns.push(Column::new(name, column_type));
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.values.push(value);
                }
            },
        }
        Ok(())
    }
}

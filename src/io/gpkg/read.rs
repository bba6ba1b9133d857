//! GeoPackage reading operations.

use std::{collections::HashMap, path::{Path, PathBuf}};

use anyhow::{anyhow, bail, ensure, Context, Result};
use geo::Geometry;
use rusqlite::{types::ValueRef, Connection, OpenFlags, OptionalExtension};
use tracing::debug;

use crate::{geom::{self, Crs}, io::wkb, layer::{Feature, Layer, Value}};

/// GeoPackage binary header magic.
const GP_MAGIC: &[u8; 2] = b"GP";

/// Declared SQLite column types that carry meaning beyond storage class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Declared {
    Boolean,
    Date,
    DateTime,
    Other,
}

impl Declared {
    fn parse(decl: &str) -> Self {
        match decl.trim().to_ascii_uppercase().as_str() {
            "BOOLEAN" => Declared::Boolean,
            "DATE" => Declared::Date,
            "DATETIME" | "TIMESTAMP" => Declared::DateTime,
            _ => Declared::Other,
        }
    }
}

/// An attribute column of a feature table.
#[derive(Debug, Clone)]
struct Column {
    name: String,
    declared: Declared,
    /// Enumerated domain: stored code to optional description.
    categories: Option<HashMap<String, Option<String>>>,
}

/// A GeoPackage opened read-only.
pub(crate) struct GeoPackage {
    conn: Connection,
    path: PathBuf,
}

impl GeoPackage {
    /// Open a GeoPackage read-only and check it is a SQLite database.
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX)
            .with_context(|| format!("[io::gpkg::read] Failed to open {}", path.display()))?;
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
            .with_context(|| format!("[io::gpkg::read] {} is not a SQLite database", path.display()))?;
        Ok(Self { conn, path: path.to_path_buf() })
    }

    /// Names of the feature tables registered in `gpkg_contents`, in registration order.
    pub(crate) fn feature_tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn
            .prepare("SELECT table_name FROM gpkg_contents WHERE data_type = 'features' ORDER BY rowid")
            .context("[io::gpkg::read] Failed to query gpkg_contents")?;
        let tables = stmt.query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("[io::gpkg::read] Failed to list feature tables")?;
        Ok(tables)
    }

    /// The first table with a registered geometry column.
    pub(crate) fn first_geometry_table(&self) -> Result<String> {
        self.conn
            .query_row("SELECT table_name FROM gpkg_geometry_columns ORDER BY rowid LIMIT 1", [], |row| row.get(0))
            .optional()
            .context("[io::gpkg::read] Failed to query gpkg_geometry_columns")?
            .ok_or_else(|| anyhow!("[io::gpkg::read] No geometry table in {}", self.path.display()))
    }

    /// Read one feature table as a layer.
    pub(crate) fn read_layer(&self, table: &str, name: &str) -> Result<Layer> {
        let (geom_column, srs_id) = self.conn
            .query_row(
                "SELECT column_name, srs_id FROM gpkg_geometry_columns WHERE table_name = ?1",
                [table],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()
            .with_context(|| format!("[io::gpkg::read] Failed to query geometry column of {table}"))?
            .ok_or_else(|| anyhow!("[io::gpkg::read] Table {table} has no registered geometry column"))?;

        let crs = self.resolve_srs(srs_id)?;
        let columns = self.attribute_columns(table, &geom_column)?;

        let select = std::iter::once(&geom_column)
            .chain(columns.iter().map(|c| &c.name))
            .map(|c| quote(c))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("SELECT {select} FROM {}", quote(table));
        let mut stmt = self.conn.prepare(&sql)
            .with_context(|| format!("[io::gpkg::read] Failed to prepare select on {table}"))?;
        let mut rows = stmt.query([])?;

        let mut features = Vec::new();
        let mut row_idx = 0usize;
        while let Some(row) = rows.next()? {
            row_idx += 1;
            let geometry = match row.get_ref(0)? {
                ValueRef::Null => None,
                ValueRef::Blob(blob) => geometry_from_gpkg(blob)
                    .with_context(|| format!("[io::gpkg::read] Bad geometry in row {row_idx} of {table}"))?,
                other => bail!("[io::gpkg::read] Geometry in row {row_idx} of {table} is not a blob: {:?}", other.data_type()),
            };
            let Some(geometry) = geometry.filter(|g| !geom::is_empty(g)) else { continue };

            let properties = columns.iter().enumerate()
                .map(|(i, column)| -> Result<Value> { Ok(column.value(row.get_ref(i + 1)?)) })
                .collect::<Result<Vec<_>>>()?;
            features.push(Feature { properties, geometry });
        }

        let names = columns.into_iter().map(|c| c.name).collect();
        Ok(Layer::new(name, names, features, crs))
    }

    /// Attribute columns in table order, without the primary key and geometry column.
    fn attribute_columns(&self, table: &str, geom_column: &str) -> Result<Vec<Column>> {
        let mut categories = self.enum_constraints(table);

        let mut stmt = self.conn.prepare("SELECT name, type, pk FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt
            .query_map([table], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, i64>(2)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("[io::gpkg::read] Failed to read columns of {table}"))?
            .into_iter()
            .filter(|(name, _, pk)| *pk == 0 && !name.eq_ignore_ascii_case(geom_column))
            .map(|(name, decl, _)| Column {
                categories: categories.remove(&name),
                declared: Declared::parse(&decl),
                name,
            })
            .collect::<Vec<_>>();
        ensure!(!columns.is_empty() || self.table_exists(table)?, "[io::gpkg::read] Table {table} does not exist");
        Ok(columns)
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        let found = self.conn
            .query_row("SELECT 1 FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1", [table], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    /// `enum` constraints from the schema extension; absent tables mean no constraints.
    fn enum_constraints(&self, table: &str) -> HashMap<String, HashMap<String, Option<String>>> {
        let query = || -> rusqlite::Result<Vec<(String, String, Option<String>)>> {
            let mut stmt = self.conn.prepare(
                "SELECT dc.column_name, c.value, c.description \
                 FROM gpkg_data_columns dc \
                 JOIN gpkg_data_column_constraints c ON c.constraint_name = dc.constraint_name \
                 WHERE dc.table_name = ?1 AND c.constraint_type = 'enum'",
            )?;
            let rows = stmt.query_map([table], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
            rows.collect()
        };

        let mut out: HashMap<String, HashMap<String, Option<String>>> = HashMap::new();
        match query() {
            Ok(rows) => for (column, code, label) in rows {
                out.entry(column).or_default().insert(code, label);
            },
            Err(e) => debug!("No enum constraints for {table}: {e}"),
        }
        out
    }

    /// Resolve a `gpkg_spatial_ref_sys` entry. Undefined systems (0, -1) resolve to `None`.
    fn resolve_srs(&self, srs_id: i64) -> Result<Option<Crs>> {
        if srs_id == 0 || srs_id == -1 { return Ok(None) }

        let entry = self.conn
            .query_row(
                "SELECT organization, organization_coordsys_id, definition FROM gpkg_spatial_ref_sys WHERE srs_id = ?1",
                [srs_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?, row.get::<_, String>(2)?)),
            )
            .optional()
            .context("[io::gpkg::read] Failed to query gpkg_spatial_ref_sys")?;

        let Some((organization, code, definition)) = entry else {
            debug!("srs_id {srs_id} is not registered in {}", self.path.display());
            return Ok(None);
        };
        if organization.eq_ignore_ascii_case("EPSG") {
            if let Ok(code) = u32::try_from(code) { return Ok(Some(Crs::Epsg(code))) }
        }
        match definition.trim() {
            "" | "undefined" => Ok(None),
            wkt => Ok(Some(Crs::from_wkt(wkt))),
        }
    }
}

impl Column {
    /// Convert a stored SQLite value according to the column's declaration.
    fn value(&self, raw: ValueRef<'_>) -> Value {
        let value = match raw {
            ValueRef::Null => return Value::Null,
            ValueRef::Integer(i) if self.declared == Declared::Boolean => Value::Bool(i != 0),
            ValueRef::Integer(i) => Value::Int(i),
            ValueRef::Real(f) => Value::Float(f),
            ValueRef::Text(bytes) => {
                let text = String::from_utf8_lossy(bytes).into_owned();
                match self.declared {
                    Declared::Date | Declared::DateTime => Value::parse_temporal(&text).unwrap_or(Value::Text(text)),
                    _ => Value::Text(text),
                }
            }
            ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
        };

        match &self.categories {
            Some(domain) => {
                let code = value.to_string();
                let label = domain.get(&code).cloned().flatten();
                Value::Category { code, label }
            }
            None => value,
        }
    }
}

/// Quote an SQLite identifier.
fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Decode a GeoPackage geometry blob: `GP` header, optional envelope, then WKB.
/// Returns `None` for geometries flagged empty.
pub(crate) fn geometry_from_gpkg(blob: &[u8]) -> Result<Option<Geometry<f64>>> {
    ensure!(blob.len() >= 8, "[io::gpkg::read] Geometry blob too short ({} bytes)", blob.len());
    ensure!(&blob[0..2] == GP_MAGIC, "[io::gpkg::read] Missing GeoPackage magic");

    let flags = blob[3];
    let envelope_len = match (flags >> 1) & 0b111 {
        0 => 0,
        1 => 32,
        2 | 3 => 48,
        4 => 64,
        other => bail!("[io::gpkg::read] Invalid envelope indicator {other}"),
    };
    if flags & 0b1_0000 != 0 { return Ok(None) }

    let header_len = 8 + envelope_len;
    ensure!(blob.len() > header_len, "[io::gpkg::read] Geometry blob ends inside its header");
    wkb::geometry_from_wkb(&blob[header_len..]).map(Some)
}

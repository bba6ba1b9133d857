use std::path::{Path, PathBuf};

use geo::{BoundingRect, Geometry, Rect};

use crate::{geom::{self, Crs}, layer::{ColumnKind, Value}};

static NULL: Value = Value::Null;

/// Vector formats recognized by discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Shapefile,
    GeoPackage,
    GeoJson,
}

impl Format {
    /// Detect a format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "shp" => Some(Format::Shapefile),
            "gpkg" => Some(Format::GeoPackage),
            "geojson" | "json" => Some(Format::GeoJson),
            _ => None,
        }
    }
}

/// A discovered file and its detected format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorFile {
    path: PathBuf,
    format: Format,
}

impl VectorFile {
    /// Wrap a path if its extension is a supported vector format.
    pub fn new(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let format = Format::from_path(&path)?;
        Some(Self { path, format })
    }

    #[inline] pub fn path(&self) -> &Path { &self.path }
    #[inline] pub fn format(&self) -> Format { self.format }

    /// File name without extension, used for layer names.
    pub fn stem(&self) -> String {
        self.path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// File name for log lines.
    pub fn file_name(&self) -> String {
        self.path.file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Column schema entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub kind: ColumnKind,
}

/// One row: attribute values aligned with the layer's fields, plus a geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub properties: Vec<Value>,
    pub geometry: Geometry<f64>,
}

/// A named table of geometry-bearing records from one file or one container section.
#[derive(Debug, Clone)]
pub struct Layer {
    name: String,
    fields: Vec<Field>,
    features: Vec<Feature>,
    crs: Option<Crs>,
}

impl Layer {
    /// Build a layer, inferring each field's kind from its values.
    pub fn new(name: impl Into<String>, columns: Vec<String>, features: Vec<Feature>, crs: Option<Crs>) -> Self {
        let fields = columns.into_iter().enumerate()
            .map(|(i, name)| Field {
                kind: ColumnKind::infer(features.iter().filter_map(|f| f.properties.get(i))),
                name,
            })
            .collect();
        Self { name: name.into(), fields, features, crs }
    }

    /// Build a layer with an explicit schema.
    pub fn with_fields(name: impl Into<String>, fields: Vec<Field>, features: Vec<Feature>, crs: Option<Crs>) -> Self {
        Self { name: name.into(), fields, features, crs }
    }

    #[inline] pub fn name(&self) -> &str { &self.name }
    #[inline] pub fn fields(&self) -> &[Field] { &self.fields }
    #[inline] pub fn features(&self) -> &[Feature] { &self.features }
    #[inline] pub fn crs(&self) -> Option<&Crs> { self.crs.as_ref() }
    #[inline] pub fn len(&self) -> usize { self.features.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.features.is_empty() }

    #[inline] pub(crate) fn fields_mut(&mut self) -> &mut [Field] { &mut self.fields }
    #[inline] pub(crate) fn features_mut(&mut self) -> &mut [Feature] { &mut self.features }
    #[inline] pub(crate) fn set_crs(&mut self, crs: Option<Crs>) { self.crs = crs }

    /// Index of a named field.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Value of a named attribute on feature `row`.
    pub fn property(&self, row: usize, name: &str) -> Option<&Value> {
        let idx = self.field_index(name)?;
        self.features.get(row)?.properties.get(idx)
    }

    /// Iterate one column's values (missing trailing values read as null).
    pub(crate) fn column(&self, idx: usize) -> impl Iterator<Item = &Value> {
        self.features.iter().map(move |f| f.properties.get(idx).unwrap_or(&NULL))
    }

    /// Names of the non-geometry columns, in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Keep only the named columns, in the given order; unknown names are skipped.
    pub fn select(&mut self, names: &[&str]) {
        let picks: Vec<usize> = names.iter().filter_map(|n| self.field_index(n)).collect();
        self.fields = picks.iter().map(|&i| self.fields[i].clone()).collect();
        for feature in &mut self.features {
            feature.properties = picks.iter()
                .map(|&i| feature.properties.get(i).cloned().unwrap_or(Value::Null))
                .collect();
        }
    }

    /// Keep features matching `pred`.
    pub fn retain(&mut self, pred: impl FnMut(&Feature) -> bool) {
        self.features.retain(pred);
    }

    /// Append a column computed per feature; its kind is inferred.
    pub fn push_column(&mut self, name: impl Into<String>, mut f: impl FnMut(&Feature) -> Value) {
        for feature in &mut self.features {
            let value = f(feature);
            feature.properties.push(value);
        }
        let idx = self.fields.len();
        let kind = ColumnKind::infer(self.column(idx));
        self.fields.push(Field { name: name.into(), kind });
    }

    /// Compute the bounding rectangle of all feature geometries.
    pub fn bounding_box(&self) -> Option<Rect<f64>> {
        self.features.iter()
            .filter_map(|feature| feature.geometry.bounding_rect())
            .reduce(geom::union_rect)
    }
}

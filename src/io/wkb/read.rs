//! WKB reading operations.

use std::io::{Cursor, Read};

use anyhow::{bail, Context, Result};
use geo::{Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};

/// WKB byte order: big endian
const WKB_BE: u8 = 0;
/// WKB byte order: little endian
const WKB_LE: u8 = 1;

const WKB_POINT: u32 = 1;
const WKB_LINESTRING: u32 = 2;
const WKB_POLYGON: u32 = 3;
const WKB_MULTIPOINT: u32 = 4;
const WKB_MULTILINESTRING: u32 = 5;
const WKB_MULTIPOLYGON: u32 = 6;
const WKB_GEOMETRYCOLLECTION: u32 = 7;

/// EWKB (PostGIS) dimension and SRID flags.
const EWKB_Z: u32 = 0x8000_0000;
const EWKB_M: u32 = 0x4000_0000;
const EWKB_SRID: u32 = 0x2000_0000;

/// Smallest encoded size of one coordinate pair, used to cap pre-allocation.
const MIN_COORD_BYTES: usize = 16;

/// Cursor over one WKB geometry, tracking the byte order of the current header.
struct WkbCursor<'a> {
    cursor: Cursor<&'a [u8]>,
    is_le: bool,
}

impl<'a> WkbCursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { cursor: Cursor::new(bytes), is_le: true }
    }

    #[inline]
    fn remaining(&self) -> usize {
        let len = self.cursor.get_ref().len();
        len.saturating_sub(self.cursor.position() as usize)
    }

    fn read_u8(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.cursor.read_exact(&mut byte)
            .context("[io::wkb::read] Failed to read byte order")?;
        Ok(byte[0])
    }

    fn read_u32(&mut self) -> Result<u32> {
        let mut bytes = [0u8; 4];
        self.cursor.read_exact(&mut bytes)
            .context("[io::wkb::read] Failed to read integer")?;
        Ok(if self.is_le { u32::from_le_bytes(bytes) } else { u32::from_be_bytes(bytes) })
    }

    fn read_f64(&mut self) -> Result<f64> {
        let mut bytes = [0u8; 8];
        self.cursor.read_exact(&mut bytes)
            .context("[io::wkb::read] Failed to read coordinate")?;
        Ok(if self.is_le { f64::from_le_bytes(bytes) } else { f64::from_be_bytes(bytes) })
    }

    /// Read a count and bound it by what the remaining bytes could hold.
    fn read_count(&mut self, min_item_bytes: usize) -> Result<usize> {
        let count = self.read_u32()? as usize;
        if count.saturating_mul(min_item_bytes) > self.remaining() {
            bail!("[io::wkb::read] Count {count} exceeds remaining {} bytes", self.remaining());
        }
        Ok(count)
    }

    /// Read one coordinate, dropping Z and M ordinates.
    fn read_coord(&mut self, dims: usize) -> Result<Coord<f64>> {
        let x = self.read_f64()?;
        let y = self.read_f64()?;
        for _ in 2..dims { self.read_f64()?; }
        Ok(Coord { x, y })
    }

    fn read_coords(&mut self, dims: usize) -> Result<Vec<Coord<f64>>> {
        let len = self.read_count(MIN_COORD_BYTES)?;
        (0..len).map(|_| self.read_coord(dims)).collect()
    }

    /// Read a geometry header: byte order, type code, optional EWKB SRID.
    /// Returns the base type and the number of ordinates per coordinate.
    fn read_header(&mut self) -> Result<(u32, usize)> {
        self.is_le = match self.read_u8()? {
            WKB_LE => true,
            WKB_BE => false,
            other => bail!("[io::wkb::read] Invalid byte order marker {other}"),
        };

        let code = self.read_u32()?;
        let mut dims = 2;
        if code & EWKB_Z != 0 { dims += 1 }
        if code & EWKB_M != 0 { dims += 1 }
        if code & EWKB_SRID != 0 { self.read_u32()?; }

        // ISO codes: 1000s for Z, 2000s for M, 3000s for ZM.
        let iso = code & 0x0fff_ffff;
        dims += match iso / 1000 {
            0 => 0,
            1 | 2 => 1,
            3 => 2,
            _ => bail!("[io::wkb::read] Unsupported geometry type code {code:#x}"),
        };
        Ok((iso % 1000, dims))
    }

    fn read_geometry(&mut self) -> Result<Geometry<f64>> {
        let (kind, dims) = self.read_header()?;
        let geometry = match kind {
            WKB_POINT => {
                let coord = self.read_coord(dims)?;
                // POINT EMPTY is encoded as NaN coordinates.
                if coord.x.is_nan() && coord.y.is_nan() {
                    Geometry::MultiPoint(MultiPoint(vec![]))
                } else {
                    Geometry::Point(Point(coord))
                }
            }
            WKB_LINESTRING => Geometry::LineString(LineString(self.read_coords(dims)?)),
            WKB_POLYGON => Geometry::Polygon(self.read_polygon_body(dims)?),
            WKB_MULTIPOINT => {
                let points = self.read_members(|g| match g {
                    Geometry::Point(p) => Ok(Some(p)),
                    Geometry::MultiPoint(mp) if mp.0.is_empty() => Ok(None),
                    other => bail!("[io::wkb::read] Expected Point in MultiPoint, got {other:?}"),
                })?;
                Geometry::MultiPoint(MultiPoint(points))
            }
            WKB_MULTILINESTRING => {
                let lines = self.read_members(|g| match g {
                    Geometry::LineString(ls) => Ok(Some(ls)),
                    other => bail!("[io::wkb::read] Expected LineString in MultiLineString, got {other:?}"),
                })?;
                Geometry::MultiLineString(MultiLineString(lines))
            }
            WKB_MULTIPOLYGON => {
                let polygons = self.read_members(|g| match g {
                    Geometry::Polygon(p) => Ok(Some(p)),
                    other => bail!("[io::wkb::read] Expected Polygon in MultiPolygon, got {other:?}"),
                })?;
                Geometry::MultiPolygon(MultiPolygon(polygons))
            }
            WKB_GEOMETRYCOLLECTION => {
                let members = self.read_members(|g| Ok(Some(g)))?;
                Geometry::GeometryCollection(GeometryCollection(members))
            }
            other => bail!("[io::wkb::read] Unsupported geometry type {other}"),
        };
        Ok(geometry)
    }

    /// Polygon rings after the header; the first ring is the exterior.
    fn read_polygon_body(&mut self, dims: usize) -> Result<Polygon<f64>> {
        let num_rings = self.read_count(4)?;
        if num_rings == 0 {
            return Ok(Polygon::new(LineString(vec![]), vec![]));
        }
        let exterior = LineString(self.read_coords(dims)?);
        let interiors = (1..num_rings)
            .map(|_| self.read_coords(dims).map(LineString))
            .collect::<Result<Vec<_>>>()?;
        Ok(Polygon::new(exterior, interiors))
    }

    /// Members of a multi-geometry; each carries its own header and byte order.
    fn read_members<T>(&mut self, mut accept: impl FnMut(Geometry<f64>) -> Result<Option<T>>) -> Result<Vec<T>> {
        let count = self.read_count(5)?;
        let mut members = Vec::with_capacity(count);
        for _ in 0..count {
            let member = self.read_geometry()?;
            if let Some(m) = accept(member)? { members.push(m) }
        }
        Ok(members)
    }
}

/// Parse one WKB geometry (ISO or EWKB, either byte order). Z and M ordinates are dropped.
pub(crate) fn geometry_from_wkb(bytes: &[u8]) -> Result<Geometry<f64>> {
    let mut cursor = WkbCursor::new(bytes);
    cursor.read_geometry()
        .context("[io::wkb::read] Failed to parse WKB geometry")
}

use std::{fmt, sync::LazyLock};

use regex::Regex;

/// Spatial reference of a layer's coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Crs {
    /// A registered EPSG code.
    Epsg(u32),
    /// A WKT or PROJ definition that did not resolve to a known EPSG code.
    Definition(String),
}

/// PROJ.4 string of EPSG:4326, the target of every reprojection.
pub(crate) const WGS84_LONGLAT: &str = "+proj=longlat +datum=WGS84 +no_defs +type=crs";

/// Spherical Mercator under its pre-registration code, which the EPSG tables lack.
const GOOGLE_MERCATOR: &str = "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs +type=crs";

impl Crs {
    /// EPSG:4326, the canonical system of every rendered layer.
    pub const WGS84: Crs = Crs::Epsg(4326);

    #[inline] pub fn is_wgs84(&self) -> bool { *self == Crs::WGS84 }

    /// The EPSG code, when known.
    #[inline]
    pub fn epsg(&self) -> Option<u32> {
        match self {
            Crs::Epsg(code) => Some(*code),
            Crs::Definition(_) => None,
        }
    }

    /// Parse an OGC CRS name as found in GeoJSON `crs` members and GeoPackage metadata:
    /// `EPSG:32643`, `urn:ogc:def:crs:EPSG::32643`, `urn:ogc:def:crs:OGC:1.3:CRS84`.
    pub fn from_name(name: &str) -> Option<Crs> {
        static EPSG_NAME: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"(?i)^(?:urn:ogc:def:crs:)?EPSG:(?:[\d.]*:)?(\d+)$").unwrap()
        });

        let name = name.trim();
        if name.eq_ignore_ascii_case("urn:ogc:def:crs:OGC:1.3:CRS84") || name.eq_ignore_ascii_case("CRS84") {
            return Some(Crs::WGS84);
        }
        EPSG_NAME.captures(name)
            .and_then(|caps| caps[1].parse().ok())
            .map(Crs::Epsg)
    }

    /// Resolve a WKT definition (a `.prj` file or `gpkg_spatial_ref_sys.definition`).
    ///
    /// The root's own `AUTHORITY`/`ID` wins; failing that, well-known ESRI and EPSG
    /// names are matched. Anything else is kept as an opaque definition.
    pub fn from_wkt(wkt: &str) -> Crs {
        static AUTHORITY: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r#"(?i)(?:AUTHORITY|ID)\[\s*"EPSG"\s*,\s*"?(\d+)"?\s*\]\s*\]\s*$"#).unwrap()
        });
        static ROOT_NAME: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r#"^\s*(?:PROJCS|GEOGCS|PROJCRS|GEOGCRS|GEODCRS)\[\s*"([^"]+)""#).unwrap()
        });

        // Only an authority that closes the root object names the root; nested
        // GEOGCS or UNIT authorities say nothing about the projection.
        if let Some(code) = AUTHORITY.captures(wkt).and_then(|c| c[1].parse().ok()) {
            return Crs::Epsg(code);
        }

        ROOT_NAME.captures(wkt)
            .and_then(|caps| epsg_from_crs_name(&caps[1]))
            .map(Crs::Epsg)
            .unwrap_or_else(|| Crs::Definition(wkt.trim().to_string()))
    }

    /// PROJ.4 string for systems outside the EPSG registry: the legacy
    /// 900913 code and definitions that are already PROJ.4 strings.
    pub(crate) fn proj_string(&self) -> Option<&str> {
        match self {
            Crs::Epsg(900913) => Some(GOOGLE_MERCATOR),
            Crs::Epsg(_) => None,
            Crs::Definition(def) => Some(def.trim()).filter(|d| d.starts_with("+proj=")),
        }
    }
}

/// Map a root CRS name (ESRI `.prj` or EPSG-style) to its EPSG code.
fn epsg_from_crs_name(name: &str) -> Option<u32> {
    static UTM_ZONE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^(wgs ?(?:19)?84|nad ?(?:19)?83|kalianpur 1962)(?: /)? utm zone (\d{1,2}) ?([ns])$").unwrap()
    });

    // "WGS_1984_UTM_Zone_43N" and "WGS 84 / UTM zone 43N" normalize alike.
    let normalized = name.replace('_', " ").to_ascii_lowercase();
    let normalized = normalized.split_whitespace().collect::<Vec<_>>().join(" ");

    if let Some(caps) = UTM_ZONE.captures(&normalized) {
        let zone: u32 = caps[2].parse().ok()?;
        let north = &caps[3] == "n";
        return match (&caps[1], north) {
            (datum, true) if datum.starts_with("wgs") && (1..=60).contains(&zone) => Some(32600 + zone),
            (datum, false) if datum.starts_with("wgs") && (1..=60).contains(&zone) => Some(32700 + zone),
            (datum, true) if datum.starts_with("nad") && (1..=23).contains(&zone) => Some(26900 + zone),
            ("kalianpur 1962", true) if (41..=43).contains(&zone) => Some(24270 + zone),
            _ => None,
        };
    }

    match normalized.as_str() {
        "gcs wgs 1984" | "wgs 84" | "wgs 1984" | "wgs84" => Some(4326),
        "gcs north american 1983" | "nad83" => Some(4269),
        "gcs kalianpur 1962" | "kalianpur 1962" => Some(4145),
        "wgs 1984 web mercator auxiliary sphere" | "wgs 1984 web mercator" | "wgs 84 / pseudo-mercator" => Some(3857),
        _ => None,
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Epsg(code) => write!(f, "EPSG:{code}"),
            Crs::Definition(text) => {
                let head: String = text.chars().take(48).collect();
                if head.len() < text.len() { write!(f, "'{head}...'") } else { write!(f, "'{head}'") }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ESRI_UTM_43N: &str = r#"PROJCS["WGS_1984_UTM_Zone_43N",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",75.0],PARAMETER["Scale_Factor",0.9996],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;

    #[test]
    fn esri_prj_names_resolve() {
        assert_eq!(Crs::from_wkt(ESRI_UTM_43N), Crs::Epsg(32643));
        assert_eq!(
            Crs::from_wkt(r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]]]"#),
            Crs::WGS84,
        );
        assert_eq!(Crs::from_wkt(r#"PROJCS["WGS_1984_Web_Mercator_Auxiliary_Sphere",GEOGCS["x"]]"#), Crs::Epsg(3857));
    }

    #[test]
    fn outermost_authority_wins() {
        let wkt = r#"PROJCS["WGS 84 / UTM zone 42N",GEOGCS["WGS 84",AUTHORITY["EPSG","4326"]],AUTHORITY["EPSG","32642"]]"#;
        assert_eq!(Crs::from_wkt(wkt), Crs::Epsg(32642));
    }

    #[test]
    fn nested_authority_does_not_name_the_root() {
        let wkt = r#"PROJCS["Lahore_Local_TM",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433],AUTHORITY["EPSG","4326"]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",74.0],PARAMETER["Scale_Factor",1.0],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0,AUTHORITY["EPSG","9001"]]]"#;
        let crs = Crs::from_wkt(wkt);
        assert_eq!(crs, Crs::Definition(wkt.to_string()));
        assert!(!crs.is_wgs84());
    }

    #[test]
    fn root_authority_with_trailing_whitespace() {
        let wkt = "GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",AUTHORITY[\"EPSG\",\"6326\"]],AUTHORITY[\"EPSG\",\"4326\"]]\n";
        assert_eq!(Crs::from_wkt(wkt), Crs::WGS84);
    }

    #[test]
    fn unknown_definitions_are_kept() {
        let wkt = r#"PROJCS["Local_Grid",GEOGCS["GCS_Unknown"]]"#;
        assert_eq!(Crs::from_wkt(wkt), Crs::Definition(wkt.to_string()));
    }

    #[test]
    fn ogc_names_parse() {
        assert_eq!(Crs::from_name("EPSG:32643"), Some(Crs::Epsg(32643)));
        assert_eq!(Crs::from_name("urn:ogc:def:crs:EPSG::4326"), Some(Crs::WGS84));
        assert_eq!(Crs::from_name("urn:ogc:def:crs:EPSG:6.6:3857"), Some(Crs::Epsg(3857)));
        assert_eq!(Crs::from_name("urn:ogc:def:crs:OGC:1.3:CRS84"), Some(Crs::WGS84));
        assert_eq!(Crs::from_name("something else"), None);
    }

    #[test]
    fn proj_strings_outside_the_registry() {
        assert!(Crs::Epsg(900913).proj_string().unwrap().starts_with("+proj=merc"));
        assert_eq!(Crs::Epsg(32643).proj_string(), None);
        assert_eq!(Crs::Definition(" +proj=utm +zone=43 +datum=WGS84 ".into()).proj_string(), Some("+proj=utm +zone=43 +datum=WGS84"));
        assert_eq!(Crs::Definition(r#"PROJCS["Local_Grid"]"#.into()).proj_string(), None);
    }
}

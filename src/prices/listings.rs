use std::{collections::BTreeMap, path::Path};

use anyhow::Context;
use polars::frame::DataFrame;
use tracing::debug;

use crate::{io::csv::read_csv, prices::{parse_price, DHA_SOCIETIES}, Error};

/// One scraped listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub location: String,
    /// Last known society name contained in the location.
    pub society: Option<String>,
    pub price: Option<f64>,
}

/// Scraped listings tagged with their society.
#[derive(Debug, Clone, Default)]
pub struct PriceListings {
    listings: Vec<Listing>,
}

impl PriceListings {
    /// Tag `(location, price text)` rows with the last of `societies` each location contains.
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = (&'a str, Option<&'a str>)>, societies: &[&str]) -> Self {
        let listings = rows.into_iter()
            .map(|(location, price)| Listing {
                location: location.to_string(),
                society: societies.iter().rev().find(|s| location.contains(*s)).map(|s| s.to_string()),
                price: price.and_then(parse_price),
            })
            .collect();
        Self { listings }
    }

    /// Read a listings CSV with `Location` and `Price` columns.
    pub fn from_csv(path: &Path) -> Result<Self, Error> {
        let df = read_csv(path).map_err(|e| Error::Configuration(format!("{e:#}")))?;
        Self::from_frame(&df)
            .map_err(|e| Error::Configuration(format!("{}: {e:#}", path.display())))
    }

    fn from_frame(df: &DataFrame) -> anyhow::Result<Self> {
        let location = df.column("Location").context("listings need a Location column")?.str()?;
        let price = df.column("Price").context("listings need a Price column")?.str()?;

        let rows = location.into_iter().zip(price)
            .filter_map(|(location, price)| Some((location?, price)));
        let listings = Self::from_rows(rows, &DHA_SOCIETIES);
        debug!("Read {} listings, {} with a society", listings.len(), listings.tagged().count());
        Ok(listings)
    }

    #[inline] pub fn listings(&self) -> &[Listing] { &self.listings }
    #[inline] pub fn len(&self) -> usize { self.listings.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.listings.is_empty() }

    fn tagged(&self) -> impl Iterator<Item = &Listing> {
        self.listings.iter().filter(|l| l.society.is_some())
    }

    /// Mean parsed price per society. Unpriced listings are ignored; a society
    /// with no priced listing is absent.
    pub fn averages(&self) -> BTreeMap<String, f64> {
        let mut sums: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
        for listing in self.tagged() {
            if let (Some(society), Some(price)) = (listing.society.as_deref(), listing.price) {
                let entry = sums.entry(society).or_default();
                entry.0 += price;
                entry.1 += 1;
            }
        }
        sums.into_iter()
            .map(|(society, (sum, n))| (society.to_string(), sum / n as f64))
            .collect()
    }
}

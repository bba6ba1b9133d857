//! Listing prices: parsing scraped price text, per-society averages and the
//! price choropleth over the DHA area polygons.

mod choropleth;
mod listings;
mod parse;
mod societies;

pub use choropleth::{build_choropleth, ChoroplethOptions, ChoroplethReport};
pub use listings::{Listing, PriceListings};
pub use parse::parse_price;
pub use societies::{SocietyLookup, DHA_SOCIETIES};

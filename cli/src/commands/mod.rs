pub mod build;
pub mod choropleth;
pub mod export;

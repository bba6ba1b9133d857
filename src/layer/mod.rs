mod layer;
mod read;
mod sanitize;
mod value;

pub use layer::{Feature, Field, Format, Layer, VectorFile};
pub use read::{read_layers, LayerSet};
pub use sanitize::sanitize;
pub use value::{ColumnKind, Value};

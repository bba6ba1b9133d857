mod fs;

pub use fs::{find_vector_files, order_by_priority, require_dir_exists};
pub(crate) use fs::PendingWrite;

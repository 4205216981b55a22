mod local_store_file;
mod local_store_memory;

pub use local_store_file::*;
pub use local_store_memory::*;

pub mod chunk;
pub mod columns;
pub mod header;
pub mod prepare;
pub mod reader;

pub use chunk::chunk_prepared;
pub use columns::parse_rows;
pub use header::{locate_header, HeaderMap};
pub use prepare::{prepare, PreparedLine, PreparedStatement, Redactor};
pub use reader::{read_grid, ReadError};

//! Format-specific decoders exposing the positional table contract.

pub mod delimited;
pub mod workbook;

pub use delimited::DelimitedTable;
pub use workbook::{WorkbookFormat, WorkbookTable};

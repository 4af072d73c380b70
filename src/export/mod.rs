pub mod csv;

pub use csv::{export_csv, export_filename};

use data_unit::DataUnits;
use lazy_static::lazy_static;
use resvg::usvg::fontdb;
use std::sync::Arc;

pub mod alignment;
pub mod apl_mhc_table;
pub mod apl_table;
pub mod chart;
pub mod data_unit;
pub mod engine;
pub mod error;
pub mod file_unit;
pub mod heatmap;
pub mod html;
pub mod io_type;
pub mod mhc_table;
pub mod peptides;
pub mod protein_sequence;
pub mod raster;
pub mod scoring;
pub mod structure;
pub mod table;
pub mod values;

pub use data_unit::create_engine;
pub use engine::{ImageFormat, RawValue, TypeEngine, ViewOptions};
pub use error::{EngineError, Result};
pub use file_unit::FileUnit;
pub use io_type::IoType;

lazy_static! {
    // Data-kind -> engine factory table
    pub static ref DATA_UNITS: DataUnits = DataUnits::default();

    // Fonts used when rasterizing chart text, loaded once per process
    pub static ref FONT_DATABASE: Arc<fontdb::Database> = {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        tracing::debug!(faces = db.len(), "loaded system fonts");
        Arc::new(db)
    };
}

pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{Market, SortDirection, StockField};
pub use error::CoreError;
pub use structs::{
    ColumnSetting, Fund, Holding, Portfolio, PricePoint, Script, ScriptDraft, ScriptId,
    ScriptOutcome, Stock, User,
};

//! On-disk storage: directory layout, sequential renaming, search history.

mod history;
mod layout;
mod namer;

pub use history::{
    DEFAULT_HISTORY_CAPACITY, HistoryEntry, HistoryError, JsonFileHistory, SearchHistory,
};
pub use layout::{DEFAULT_OUTPUT_DIR, SearchTerm, StorageLayout};
pub use namer::{RenameReport, rename_pdfs};

mod classifier;
mod loader;
mod types;

pub use classifier::{entry_text, Classifier};
pub use loader::{read_entries, read_entry, BatchManifest, ManifestEntry};
pub use types::{
    ArtifactCategory, ArtifactEntry, Classification, Delimiter, Provenance, ReportHeader,
    TableLayout, UploadKind, UploadedArtifact,
};

pub(crate) use classifier::{MAP_KEY_COLUMN, REPORT_KEY_COLUMN};

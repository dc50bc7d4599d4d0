pub mod header;
pub mod checksum;
pub mod transform;
pub mod image;
pub mod patch;
pub mod report;
pub mod error;

pub use header::{BlockHeader, HeaderRecord, FormatError};
pub use checksum::{digest_of, Digest};
pub use transform::{derive_sd, derive_primary};
pub use patch::{patch, patch_file, PatchOptions};
pub use report::PatchReport;
pub use error::Error;

pub mod compatibility;
pub mod csv_line;
pub mod extract;
pub mod normalizer;
pub mod raw_output;

pub use crate::domain::model::{NormalizeOutcome, NormalizedProfile, Record};
pub use crate::domain::ports::{ProfileStore, RemoteFetcher};
pub use crate::utils::error::Result;

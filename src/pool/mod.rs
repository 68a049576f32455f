//! Mirror pools and weighted mirror selection
//!
//! - [`random`] - Injectable random sources
//! - [`specialty`] - Traffic specialties and their categories
//! - [`weights`] - Weight tables and the [`ServerPool`]
//! - [`settings`] - Settings document and the reloadable [`SettingsStore`]

pub mod error;
pub mod random;
pub mod settings;
pub mod specialty;
pub mod weights;

pub use error::{SettingsError, SettingsResult};
pub use random::{RandomSource, SeededRandom, SequenceRandom, ThreadRandom};
pub use settings::{DownloadSettings, PoolSnapshot, SettingsStore};
pub use specialty::{specialty_for, Specialty, SpecialtyRule, SPECIALTY_RULES};
pub use weights::{ServerPool, WeightTable, SELF_SERVER};

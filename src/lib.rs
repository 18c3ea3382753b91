#[macro_use]
mod macros;

pub mod cli;
pub mod collate;
pub mod commands;
pub mod config;
pub mod dataset;
pub mod display;
pub mod error;
pub mod filter;
pub mod geocache;
pub mod navigation;
pub mod paths;
pub mod preferences;
pub mod reactive;
pub mod remote;
pub mod seen;
pub mod storage;
pub mod sync;
pub mod types;

pub use config::{Config, RemoteConfig};
pub use dataset::Dataset;
pub use error::{KennzeichenError, Result};
pub use filter::{FilterResult, FilterState, PlateGroup, SearchQuery};
pub use geocache::{GeoCache, GeocodedCity};
pub use navigation::{DrillDown, NavigationMemory, SavedContext, Session, Transition};
pub use preferences::{Language, Preferences, Theme};
pub use remote::{HttpRemote, MemoryRemote, RemoteDocument, RemoteStore};
pub use seen::{ChangeOrigin, ImportResult, SeenChange, SeenEntry, SeenStore};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use sync::{PullOutcome, SyncEngine, SyncStatus};
pub use types::{FederalState, PlateDataset, PlateRecord, ViewMode};

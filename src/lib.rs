//! Episode statistics gathering for multi-agent combat simulations: running
//! totals, a rolling win rate and an append-only CSV log shared by any number
//! of simulation drivers.

pub mod config;
pub mod error;
pub mod format;
pub mod gatherer;
pub mod handle;
pub mod logger;
pub mod record;
pub mod report;
pub mod schema;
pub mod window;

pub use crate::config::GathererConfig;
pub use crate::error::{GathererError, KeyedField};
pub use crate::gatherer::{EpisodeProgress, EpisodeStatsGatherer, GathererSnapshot};
pub use crate::handle::{DEFAULT_QUEUE_CAPACITY, GathererHandle, GathererRegistry};
pub use crate::logger::{EpisodeLogger, EpisodeOutcome};
pub use crate::record::{AgentId, EpisodeRecord, Keyed, TeamId};
pub use crate::report::{Report, ReportRow, read_report};
pub use crate::schema::ColumnSchema;
pub use crate::window::RollingWindow;

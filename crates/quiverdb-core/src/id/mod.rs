//! Id generation strategies.
//!
//! Two strategies implement [`IdGenerator`]:
//!
//! - [`SnowflakeIdGenerator`]: time-ordered numeric ids, unique without any
//!   business key, never reversible.
//! - [`SplicingIdGenerator`]: ids spliced from business keys, so equal keys
//!   always yield equal ids and ids can be split back into their parts.
//!
//! The active strategy is chosen by an [`IdConfig`] and built by
//! [`IdGeneratorFactory`]. Each graph owns its own generator; nothing is
//! global, so differently configured graphs can live in one process.
//!
//! # Example
//!
//! ```
//! use quiverdb_core::id::{IdConfig, IdGeneratorFactory};
//! use quiverdb_core::Id;
//!
//! let generator = IdGeneratorFactory::build(&IdConfig::splicing()).unwrap();
//! let marko = generator.vertex_id("person", "marko").unwrap();
//! assert_eq!(marko, Id::from("person\u{2}marko"));
//! assert_eq!(generator.split(&marko).unwrap()[0], Id::from("person"));
//! ```

mod clock;
mod snowflake;
mod splicing;

use std::fmt::Debug;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use clock::{Clock, ManualClock, SystemClock};
pub use snowflake::{
    IdWorker, SnowflakeIdGenerator, SnowflakeParts, EPOCH_MILLIS, MAX_DATACENTER_ID, MAX_WORKER_ID,
};
pub use splicing::{concat_values, SplicingIdGenerator, IDS_SPLITOR, ID_SPLITOR, NAME_SPLITOR};

use crate::error::{CoreError, CoreResult};
use crate::schema::SchemaElement;
use crate::types::{Id, IdKind};

/// Produces and parses element ids.
pub trait IdGenerator: Send + Sync + Debug {
    /// Returns the id representation this generator issues.
    fn kind(&self) -> IdKind;

    /// Returns true if equal business keys always yield equal ids.
    fn is_deterministic(&self) -> bool;

    /// Returns the id for a schema element.
    ///
    /// # Errors
    ///
    /// Fails if the name can't be used in an id or no id can be issued.
    fn schema_id(&self, element: &dyn SchemaElement) -> CoreResult<Id>;

    /// Returns the id for a vertex of `label` whose business key is `name`.
    ///
    /// # Errors
    ///
    /// Fails if the key can't be used in an id or no id can be issued.
    fn vertex_id(&self, label: &str, name: &str) -> CoreResult<Id>;

    /// Returns the id for an edge.
    ///
    /// # Errors
    ///
    /// Fails if the key can't be used in an id or no id can be issued.
    fn edge_id(&self, source: &Id, label: &str, name: &str, target: &Id) -> CoreResult<Id>;

    /// Splits a composite id back into its parts.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Unsupported`] for strategies whose ids carry no
    /// parts, and [`CoreError::InvalidArgument`] for malformed ids.
    fn split(&self, id: &Id) -> CoreResult<Vec<Id>>;

    /// Builds an id of the active representation from a string.
    ///
    /// # Errors
    ///
    /// Fails if the representation is numeric and `name` is not an integer.
    fn from_name(&self, name: &str) -> CoreResult<Id> {
        self.kind().from_str_id(name)
    }

    /// Builds an id of the active representation from an integer.
    fn from_numeric(&self, n: i64) -> Id {
        self.kind().from_i64(n)
    }

    /// Decodes an id of the active representation from storage bytes.
    ///
    /// # Errors
    ///
    /// Fails if the bytes are not a valid encoding.
    fn parse(&self, bytes: &[u8]) -> CoreResult<Id> {
        self.kind().parse(bytes)
    }
}

/// Which id strategy to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IdStrategy {
    /// Time-ordered ids issued by one worker.
    Snowflake {
        /// Worker id in `[0, 31]`.
        worker_id: i64,
        /// Datacenter id in `[0, 31]`.
        datacenter_id: i64,
    },
    /// Ids spliced from business keys.
    Splicing,
}

/// Id generation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdConfig {
    /// The strategy.
    pub strategy: IdStrategy,
    /// The id representation.
    #[serde(default)]
    pub kind: IdKind,
}

impl IdConfig {
    /// Splicing ids, always textual.
    #[must_use]
    pub const fn splicing() -> Self {
        Self { strategy: IdStrategy::Splicing, kind: IdKind::Text }
    }

    /// Numeric Snowflake ids from the given worker.
    #[must_use]
    pub const fn snowflake(worker_id: i64, datacenter_id: i64) -> Self {
        Self { strategy: IdStrategy::Snowflake { worker_id, datacenter_id }, kind: IdKind::Numeric }
    }

    /// Set the id representation.
    #[must_use]
    pub const fn kind(mut self, kind: IdKind) -> Self {
        self.kind = kind;
        self
    }

    /// Checks that the settings can be built.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] for worker or datacenter ids out
    /// of range, and for splicing combined with numeric ids.
    pub fn validate(&self) -> CoreResult<()> {
        match self.strategy {
            IdStrategy::Splicing if self.kind == IdKind::Numeric => {
                Err(CoreError::invalid("splicing ids can't use the numeric representation"))
            }
            IdStrategy::Snowflake { worker_id, datacenter_id } => {
                if !(0..=MAX_WORKER_ID).contains(&worker_id) {
                    return Err(CoreError::invalid(format!(
                        "worker id must be in [0, {MAX_WORKER_ID}], got {worker_id}"
                    )));
                }
                if !(0..=MAX_DATACENTER_ID).contains(&datacenter_id) {
                    return Err(CoreError::invalid(format!(
                        "datacenter id must be in [0, {MAX_DATACENTER_ID}], got {datacenter_id}"
                    )));
                }
                Ok(())
            }
            IdStrategy::Splicing => Ok(()),
        }
    }
}

impl Default for IdConfig {
    fn default() -> Self {
        Self::splicing()
    }
}

/// Builds id generators from configuration.
#[derive(Debug, Clone, Copy)]
pub struct IdGeneratorFactory;

impl IdGeneratorFactory {
    /// Builds the generator described by `config`, reading the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] if the configuration is invalid.
    pub fn build(config: &IdConfig) -> CoreResult<Arc<dyn IdGenerator>> {
        Self::build_with_clock(config, Arc::new(SystemClock))
    }

    /// Builds the generator described by `config` with an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] if the configuration is invalid.
    pub fn build_with_clock(
        config: &IdConfig,
        clock: Arc<dyn Clock>,
    ) -> CoreResult<Arc<dyn IdGenerator>> {
        config.validate()?;
        Ok(match config.strategy {
            IdStrategy::Snowflake { worker_id, datacenter_id } => Arc::new(
                SnowflakeIdGenerator::new(IdWorker::with_clock(worker_id, datacenter_id, clock)?, config.kind),
            ),
            IdStrategy::Splicing => Arc::new(SplicingIdGenerator::new()),
        })
    }
}

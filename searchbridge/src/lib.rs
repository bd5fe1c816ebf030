pub mod backend;
pub mod bulk;
pub mod config;
pub mod dialect;
pub mod error;
pub mod index;
pub mod lifecycle;
pub mod metrics;
pub mod naming;
pub mod orchestrator;
pub mod schema;
pub mod sharding;
pub mod transport;
pub mod work;

pub use backend::Backend;
pub use config::Config;
pub use error::{Error, Result, TransportError};
pub use index::IndexHandle;
pub use orchestrator::{ExecutionContext, WorkOrchestrator};
pub use work::{DocumentWriteResult, WriteOutcome};

pub mod config;
pub mod descriptor;
pub mod error;
pub mod listener;
pub mod normalize;
pub mod partition;
pub mod runner;

pub use config::{DescriptorConfig, FileCredentials, ProjectConfig, RunnerConfig};
pub use descriptor::{DescriptorSink, LocalDescriptorSink, ProjectDescriptor};
pub use error::{DescriptorError, EventError, FailureCause, IngestError, ListenError};
pub use listener::{ListenerStats, PartitionStores, StreamListener};
pub use normalize::{CANONICAL_FORMAT, SOURCE_FORMAT, TimestampNormalizer, collect_field_values};
pub use partition::{days_since_epoch, route};
pub use runner::{ResilientFeedRunner, RetryState, RunnerState};

mod core;
mod gateway;
mod observability;
mod providers;
mod tutoring;

pub use self::core::Config;
pub use gateway::GatewayConfig;
pub use observability::ObservabilityConfig;
pub use providers::ProvidersConfig;
pub use tutoring::{
    CacheConfig, DEFAULT_PROMPT_TEMPLATE, RetrievalConfig, StoreConfig, TutoringConfig,
};

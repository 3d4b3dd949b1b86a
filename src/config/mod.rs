pub mod schema;

pub use schema::{
    CacheConfig, Config, DEFAULT_PROMPT_TEMPLATE, GatewayConfig, ObservabilityConfig,
    ProvidersConfig, RetrievalConfig, StoreConfig, TutoringConfig,
};

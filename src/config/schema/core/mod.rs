mod env_overrides;
mod loader;
mod locale;
#[cfg(test)]
mod scoped_env;
mod types;

pub use types::Config;

pub mod schema;

pub use schema::{
    AgentConfig, AuthConfig, Config, McpConfig, McpTransport, ObservabilityConfig, ProviderConfig,
    ProviderKind,
};

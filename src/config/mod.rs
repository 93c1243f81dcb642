pub use self::parser::{Config, DatabaseConfig, DbType, LoggingConfig, Profile, ServerConfig};
pub use self::validator::ConfigError;

mod parser;
mod validator;

use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Neo4j (bolt protocol via neo4rs driver)
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,
    pub neo4j_fetch_size: usize,
    pub neo4j_max_connections: usize,

    // Postgres blob store
    pub database_url: String,

    // External NIEM canonicalizer/validator binary (absolute path)
    pub niem_tool_path: String,

    // Web server
    pub web_host: String,
    pub web_port: u16,

    // Batch executor
    /// Global cap on in-flight per-file operations, across all batches.
    pub batch_max_concurrent: usize,
    /// Hard wall-clock bound per file, including subprocess time.
    pub batch_per_file_timeout_secs: u64,
    pub batch_max_files_schema: usize,
    pub batch_max_files_ingest: usize,
    pub batch_max_files_convert: usize,

    /// Persist source bytes to the blob store after a successful graph commit.
    pub persist_source_docs: bool,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            neo4j_uri: required_env("NEO4J_URI"),
            neo4j_user: required_env("NEO4J_USER"),
            neo4j_password: required_env("NEO4J_PASSWORD"),
            neo4j_fetch_size: parsed_env("NEO4J_FETCH_SIZE", 500),
            neo4j_max_connections: parsed_env("NEO4J_MAX_CONNECTIONS", 10),
            database_url: required_env("DATABASE_URL"),
            niem_tool_path: required_env("NIEM_TOOL_PATH"),
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: env::var("WEB_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("WEB_PORT must be a number"),
            batch_max_concurrent: parsed_env("BATCH_MAX_CONCURRENT", 3),
            batch_per_file_timeout_secs: parsed_env("BATCH_PER_FILE_TIMEOUT_SECS", 60),
            batch_max_files_schema: parsed_env("BATCH_MAX_FILES_SCHEMA", 50),
            batch_max_files_ingest: parsed_env("BATCH_MAX_FILES_INGEST", 20),
            batch_max_files_convert: parsed_env("BATCH_MAX_FILES_CONVERT", 20),
            persist_source_docs: env::var("PERSIST_SOURCE_DOCS")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
        }
    }

    pub fn per_file_timeout(&self) -> Duration {
        Duration::from_secs(self.batch_per_file_timeout_secs)
    }
}

fn required_env(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| panic!("{name} must be set"))
}

fn parsed_env<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

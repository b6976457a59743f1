use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::str::FromStr;

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv().ok(); // Load .env file if present
    Config {
        mongo_uri: get_env_or_default("MONGO_URI", "mongodb://localhost:27017/"),
        mongo_db_name: get_env_or_default("MONGO_DB_NAME", "DigitalVidyaSaarthi"),
        bind_addr: get_env_or_default("BIND_ADDR", "0.0.0.0:8000"),
        static_dir: get_env_or_default("STATIC_DIR", "static"),
        match_threshold: get_parsed_or_default("MATCH_THRESHOLD", 0.1),
        embedding_url: get_env_or_default("EMBEDDING_URL", "http://localhost:8001/embed"),
        server_url: get_env_or_default("SERVER_URL", "http://localhost:8000"),
    }
});

pub struct Config {
    pub mongo_uri: String,
    pub mongo_db_name: String,
    pub bind_addr: String,
    pub static_dir: String,
    /// Minimum cosine similarity (exclusive) for a gallery image to count as a match.
    pub match_threshold: f64,
    /// Face engine endpoint used by enrollment.
    pub embedding_url: String,
    /// Base URL the `find` command talks to.
    pub server_url: String,
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_parsed_or_default<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|_| panic!("Invalid value for environment variable {key}: {raw}")),
        Err(_) => default,
    }
}

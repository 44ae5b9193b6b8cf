use log::warn;
use once_cell::sync::Lazy;
use std::{env, net::SocketAddr};

pub static CONFIG: Lazy<ServerConfig> = Lazy::new(ServerConfig::from_env);

const DEFAULT_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

pub struct ServerConfig {
    pub addr: SocketAddr,
    pub cors_origin: String,
}

impl ServerConfig {
    fn from_env() -> Self {
        let addr = match env::var("SERVER_ADDR") {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                warn!("SERVER_ADDR {:?} is invalid ({}), using {}", raw, e, DEFAULT_ADDR);
                default_addr()
            }),
            Err(_) => default_addr(),
        };
        Self {
            addr,
            cors_origin: env::var("CORS_ORIGIN").unwrap_or_else(|_| DEFAULT_CORS_ORIGIN.to_string()),
        }
    }
}

fn default_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
    /// Prefixes the event-stream path when set, as `/sse/<key>`.
    pub api_key: Option<String>,
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    pub fn sse_path(&self) -> String {
        match &self.api_key {
            Some(key) => format!("/sse/{}", key),
            None => "/sse".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: "127.0.0.1".to_string(),
            port: 0,
            api_key: None,
        }
    }
}

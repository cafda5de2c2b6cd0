/// Relay server configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP/WebSocket server binds to.
    pub port: u16,
    /// Maximum simultaneous members per room. `0` means unlimited.
    pub room_capacity: usize,
    /// Length of each connection's outbound message queue.
    pub outbound_buffer: usize,
    /// Display names are truncated to this many characters.
    pub max_name_len: usize,
    /// Name given to members who join without one.
    pub default_name: String,
    /// Chat messages longer than this are rejected.
    pub max_chat_len: usize,
    /// Length of server-chosen room codes.
    pub room_code_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            room_capacity: 8,
            outbound_buffer: 64,
            max_name_len: 24,
            default_name: "Guest".to_string(),
            max_chat_len: 500,
            room_code_len: 6,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Every variable is optional; missing or unparsable values fall back to
    /// [`Config::default`].
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: parsed_var("PORT").unwrap_or(defaults.port),
            room_capacity: parsed_var("ROOM_CAPACITY").unwrap_or(defaults.room_capacity),
            outbound_buffer: parsed_var("OUTBOUND_BUFFER")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.outbound_buffer),
            max_name_len: parsed_var("MAX_NAME_LEN")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.max_name_len),
            default_name: std::env::var("DEFAULT_NAME")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.default_name),
            max_chat_len: parsed_var("MAX_CHAT_LEN").unwrap_or(defaults.max_chat_len),
            room_code_len: parsed_var("ROOM_CODE_LEN")
                .filter(|n: &usize| *n >= 4)
                .unwrap_or(defaults.room_code_len),
        }
    }
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "ignoring unparsable env var");
            None
        }
    }
}

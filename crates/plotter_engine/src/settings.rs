use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Base of the URL-issuing and processing-trigger API.
    pub api_base_url: String,
    /// Fixed websocket endpoint of the message channel.
    pub channel_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:3000/".to_string(),
            channel_url: "ws://127.0.0.1:3001/".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

// carewatch-api: transport clients for the home-care sensor gateway (event socket + alert history)

pub mod error;
pub mod history;
pub mod transport;
pub mod websocket;

pub use error::Error;
pub use history::{AlertId, AlertRecord, HistoryClient, parse_timestamp};
pub use transport::HttpConfig;
pub use websocket::{EventSocket, Inbound, SensorSocket, Transport, WebSocketTransport};

mod api_client;
mod error;
mod port;
mod realtime;
mod request;
mod session_store;
mod transport_reqwest;

pub use api_client::*;
pub use error::*;
pub use port::*;
pub use realtime::*;
pub use request::*;
pub use session_store::*;
pub use transport_reqwest::*;

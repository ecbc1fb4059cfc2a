pub mod clock;
pub mod http_client;
pub mod navigator;
pub mod timestamp;
pub mod token_store;

pub use clock::{Clock, SystemClock, TokioClock};
pub use http_client::{ApiClient, ApiError, ApiRequest};
pub use navigator::{Navigator, RecordingNavigator};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};

pub mod client;
pub mod gateway;
pub mod query;
pub mod toast;
pub mod transport;

pub use client::{ApiClient, Envelope, LoginResponse, Paginated};
pub use gateway::Gateway;
pub use query::{QueryClient, QueryHandle, QueryOptions, fetcher};
pub use toast::{Toast, ToastLevel, ToastSink};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, ReqwestTransport};

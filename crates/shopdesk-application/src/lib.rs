//! Application layer: the composition root and the use cases the dashboard
//! views call into.

pub mod accounting_service;
pub mod auth_service;
pub mod context;
pub mod resource_service;
pub mod router;
pub mod telemetry;
pub mod toast;

pub use accounting_service::{AccountingService, PageRequest, TransactionDraft, TransactionType};
pub use auth_service::AuthService;
pub use context::AppContext;
pub use resource_service::{DocumentDraft, ResourceService};
pub use router::Router;
pub use toast::{ToastQueue, TracingToastSink};

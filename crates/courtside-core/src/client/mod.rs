pub mod cache;
pub mod sync;
pub mod transport;
pub mod xml;

pub use cache::{DiscoveryTicket, FieldCache};
pub use sync::{PushReport, RefreshReport, SyncOrchestrator};
pub use transport::{HttpTransport, Transport};

/*!
 * How we deliver: HTTP client and the background delivery worker.
 */

mod http;
mod worker;

pub use http::{ApiClient, ApiClientOptions};
pub use worker::{FlushSignal, Worker, WorkerMsg};

pub mod retrying_prober;
pub mod stream_prober;
pub mod stream_verifier;

pub use retrying_prober::RetryingProber;
pub use stream_prober::{HttpProber, ProbeHeaders, ProbeResult, Prober};
pub use stream_verifier::StreamVerifier;

pub mod retry;
pub mod url;

pub use url::UrlUtils;

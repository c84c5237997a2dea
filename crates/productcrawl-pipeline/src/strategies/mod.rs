//! The seven job-type strategies, one module per Go pipeline file.

mod discovery;
mod generic;
mod ondemand;
mod qa;
mod realtime;
mod recrawl;
mod testwrapper;

pub use discovery::DiscoveryStrategy;
pub use generic::CrawlStrategy;
pub use ondemand::OnDemandStrategy;
pub use qa::QaStrategy;
pub use realtime::RealtimeStrategy;
pub use recrawl::RecrawlStrategy;
pub use testwrapper::TestWrapperStrategy;

//! The warm search daemon (C8): a long-lived TCP process dispatching
//! line-delimited JSON queries to a namespace-keyed retriever registry, plus
//! the stdlib-only client hook runners use to talk to it.

pub mod client;
pub mod lifecycle;
pub mod pidfile;
pub mod policy_retriever;
pub mod protocol;
pub mod retriever;
pub mod server;

pub use lifecycle::{run, DaemonConfig, DEFAULT_PORT};
pub use pidfile::PidFile;
pub use policy_retriever::PolicyRetriever;
pub use protocol::{Request, Response};
pub use retriever::{Registry, Retriever};

//! Request routing: hashing, cookie extraction, project resolution and the
//! decision engine.

pub mod context;
pub mod engine;
pub mod extract;
pub mod hash;
pub mod resolver;

pub use context::{RequestUrl, RoutingContext};
pub use engine::{Decision, RoutingEngine, RoutingRule, Version};
pub use extract::{parse_cookies, RequestSignals};
pub use hash::{hash_to_bucket, BUCKETS};
pub use resolver::{MatchKind, ProjectResolver, Resolution};

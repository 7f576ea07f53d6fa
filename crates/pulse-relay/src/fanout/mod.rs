//! Event delivery to computed socket sets.

pub mod router;

pub use router::FanoutRouter;

// src/ranges/mod.rs
pub mod enumerate;
pub mod partition;
pub mod source;
pub mod types;

pub use enumerate::{HostAddresses, enumerate_hosts};
pub use partition::partition;
pub use source::{AwsRangeFetcher, FileRangeSource, PrefixFilter, RangeSource, StaticRanges};
pub use types::{IpRangeDocument, IpRangePrefix};

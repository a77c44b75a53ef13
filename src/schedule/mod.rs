//! Copy/XOR schedules: compilation, execution, decoding and caching

pub mod cache;
pub mod compiler;
pub mod decoding;
pub mod ops;

pub use cache::ScheduleCache;
pub use compiler::{compile, dumb_schedule, smart_schedule};
pub use decoding::{generate, DecodingSchedule};
pub use ops::{Operation, PacketRef, Schedule, ScheduleStats};

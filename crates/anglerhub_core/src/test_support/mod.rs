//! Shared test doubles: an in-memory database and a settable clock.

mod clock;
mod memory;

pub use clock::MutableClock;
pub use memory::InMemoryDatabase;

//! Synchronization primitives shared by the proxy's resource locks.

mod gate;

pub use gate::{BroadcastGate, WaitHandle};

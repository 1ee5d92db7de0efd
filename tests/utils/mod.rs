pub mod actions;
pub mod assertions;
pub mod mocks;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use assertions::{expect_event, SnapshotAssertion};
#[allow(unused_imports)]
pub use mocks::{
    FailingContentGenerator, FailingSummaryGenerator, MalformedContentGenerator, MockRoomBus,
};
#[allow(unused_imports)]
pub use setup::{TestSetup, TestSetupBuilder};

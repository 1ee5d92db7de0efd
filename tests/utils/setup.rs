use std::sync::Arc;
use tokio::time::Duration;

use duet::{
    content::{CatalogContentGenerator, ContentGenerator, Topic},
    results::{SummaryGenerator, TemplateSummaryGenerator},
    ClientDriver, ClientHandle, RoomCode, SessionConfig,
};

use super::mocks::MockRoomBus;

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub bus: Arc<MockRoomBus>,
    pub host: ClientHandle,
    pub guest: ClientHandle,
    pub code: RoomCode,
    pub topic: Topic,
    pub config: SessionConfig,
}

pub struct TestSetupBuilder {
    config: SessionConfig,
    code: String,
    content_generator: Arc<dyn ContentGenerator>,
    summary_generator: Arc<dyn SummaryGenerator>,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
            code: "ASH-1234".to_string(),
            content_generator: Arc::new(CatalogContentGenerator::new()),
            summary_generator: Arc::new(TemplateSummaryGenerator::new()),
        }
    }

    pub fn with_rounds(mut self, rounds: usize) -> Self {
        self.config = self.config.with_batch_size(rounds);
        self
    }

    pub fn with_round_duration(mut self, duration: Duration) -> Self {
        self.config = self.config.with_round_duration(duration);
        self
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.code = code.to_string();
        self
    }

    pub fn with_content_generator(mut self, generator: Arc<dyn ContentGenerator>) -> Self {
        self.content_generator = generator;
        self
    }

    pub fn with_summary_generator(mut self, generator: Arc<dyn SummaryGenerator>) -> Self {
        self.summary_generator = generator;
        self
    }

    pub fn build(self) -> TestSetup {
        let bus = Arc::new(MockRoomBus::new());

        let spawn = || {
            ClientDriver::spawn(
                self.config.clone(),
                bus.clone(),
                self.content_generator.clone(),
                self.summary_generator.clone(),
            )
        };
        let host = spawn();
        let guest = spawn();

        TestSetup {
            bus: bus.clone(),
            host,
            guest,
            code: RoomCode::parse(&self.code).unwrap(),
            topic: Topic::catalogue().remove(0),
            config: self.config,
        }
    }
}

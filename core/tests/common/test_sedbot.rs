use std::sync::Arc;

use sedbot_core::CommandProcessor;
use sedbot_core::config::Config;
use sedbot_core::protocol::ChatMessage;
use sedbot_core::protocol::EventId;
use sedbot_core::protocol::InboundEvent;
use tempfile::TempDir;

use crate::gateway::RecordingGateway;
use crate::load_default_config_for_test;
use crate::room;

type ConfigMutator = dyn FnOnce(&mut Config) + Send;

pub struct TestSedbotBuilder {
    config_mutators: Vec<Box<ConfigMutator>>,
}

impl TestSedbotBuilder {
    pub fn with_config<T>(mut self, mutator: T) -> Self
    where
        T: FnOnce(&mut Config) + Send + 'static,
    {
        self.config_mutators.push(Box::new(mutator));
        self
    }

    pub fn build(&mut self) -> anyhow::Result<TestSedbot> {
        let home = TempDir::new()?;
        let mut config = load_default_config_for_test(&home);
        for mutator in self.config_mutators.drain(..) {
            mutator(&mut config);
        }

        let gateway = Arc::new(RecordingGateway::default());
        let processor = CommandProcessor::with_gateway(config, gateway.clone());
        Ok(TestSedbot {
            home,
            gateway,
            processor,
        })
    }
}

pub struct TestSedbot {
    pub home: TempDir,
    pub gateway: Arc<RecordingGateway>,
    pub processor: CommandProcessor,
}

impl TestSedbot {
    /// Deliver `msg` as a new message. It is also made fetchable, as a real
    /// homeserver would.
    pub async fn say(&self, msg: ChatMessage) {
        self.gateway.insert_event(msg.clone());
        self.processor.handle_event(InboundEvent::Message(msg)).await;
    }

    pub async fn edit(&self, msg: ChatMessage) {
        self.processor.handle_event(InboundEvent::Edit(msg)).await;
    }

    pub async fn redact(&self, event_id: &str) {
        self.processor
            .handle_event(InboundEvent::Redaction {
                room_id: room(),
                redacts: EventId::from(event_id),
            })
            .await;
    }
}

pub fn test_sedbot() -> TestSedbotBuilder {
    TestSedbotBuilder {
        config_mutators: vec![],
    }
}

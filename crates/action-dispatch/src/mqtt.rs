//! MQTT action publisher

use crate::{ActionMessage, ActionSink, DispatchError};
use escalation::Action;
use rumqttc::{AsyncClient, Event, MqttOptions, QoS};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

/// MQTT broker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub enabled: bool,
    pub broker_host: String,
    pub broker_port: u16,
    pub client_id: String,
    pub keep_alive_s: u64,
    /// Outgoing request queue size
    pub capacity: usize,
    pub topic_prefix: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: "freightwatch".to_string(),
            keep_alive_s: 30,
            capacity: 64,
            topic_prefix: "trucks".to_string(),
        }
    }
}

impl MqttConfig {
    /// Topic for a trip's actions: `{prefix}/{trip_id}/actions`
    pub fn topic_for(&self, trip_id: &str) -> String {
        format!("{}/{}/actions", self.topic_prefix, trip_id)
    }
}

/// Publishes each action as a JSON `ActionMessage`
pub struct MqttSink {
    config: MqttConfig,
    client: AsyncClient,
}

impl MqttSink {
    /// Create the client and drive its event loop on the current runtime
    pub fn connect(config: MqttConfig) -> Result<Self, DispatchError> {
        if config.broker_host.is_empty() {
            return Err(DispatchError::Connection("empty broker host".to_string()));
        }
        // MqttOptions panics on these
        if config.client_id.is_empty() || config.client_id.starts_with(' ') {
            return Err(DispatchError::Connection(format!("invalid client id {:?}", config.client_id)));
        }

        let mut options = MqttOptions::new(&config.client_id, &config.broker_host, config.broker_port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_s.max(5)));

        let (client, mut eventloop) = AsyncClient::new(options, config.capacity.max(1));

        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(incoming)) => {
                        debug!("MQTT incoming: {:?}", incoming);
                    }
                    Err(e) => {
                        error!("MQTT error: {}", e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                    _ => {}
                }
            }
        });

        info!("MQTT sink connecting to {}:{}", config.broker_host, config.broker_port);
        Ok(Self { config, client })
    }
}

impl ActionSink for MqttSink {
    fn name(&self) -> &'static str {
        "mqtt"
    }

    fn deliver(&self, action: &Action) -> Result<(), DispatchError> {
        let payload = ActionMessage::new(action.clone()).to_json()?;
        let topic = self.config.topic_for(&action.trip_id);

        // try_publish only enqueues; a full queue is a delivery failure
        self.client
            .try_publish(&topic, QoS::AtLeastOnce, false, payload)
            .map_err(|e| DispatchError::Publish(e.to_string()))?;

        debug!("Published {} to {}", action.id, topic);
        Ok(())
    }
}

use std::{collections::HashMap, sync::Mutex};

use color_eyre::Result;

use super::Transport;

/// Records every subscription and publish instead of talking to a broker.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    subscriptions: Mutex<Vec<String>>,
    unsubscriptions: Mutex<Vec<String>>,
    published: Mutex<Vec<(String, String)>>,
}

impl RecordingTransport {
    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().unwrap().clone()
    }

    pub fn unsubscriptions(&self) -> Vec<String> {
        self.unsubscriptions.lock().unwrap().clone()
    }

    /// How many subscribers each topic still has.
    pub fn active_subscriptions(&self) -> HashMap<String, usize> {
        let mut active = HashMap::new();

        for topic in self.subscriptions() {
            *active.entry(topic).or_insert(0) += 1;
        }
        for topic in self.unsubscriptions() {
            if let Some(count) = active.get_mut(&topic) {
                *count -= 1;
            }
        }

        active.retain(|_, count| *count > 0);
        active
    }

    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().unwrap().clone()
    }

    pub fn published_to(&self, topic: &str) -> Vec<String> {
        self.published()
            .into_iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, payload)| payload)
            .collect()
    }
}

impl Transport for RecordingTransport {
    fn subscribe(&self, topic: &str) -> Result<()> {
        self.subscriptions.lock().unwrap().push(topic.to_string());
        Ok(())
    }

    fn unsubscribe(&self, topic: &str) -> Result<()> {
        self.unsubscriptions.lock().unwrap().push(topic.to_string());
        Ok(())
    }

    fn publish(&self, topic: &str, payload: String) -> Result<()> {
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), payload));
        Ok(())
    }
}

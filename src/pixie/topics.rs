use super::identity::DeviceIdentity;

/// Every Pixie topic lives under `{TOPIC_PREFIX}_{device_id}/`.
pub const TOPIC_PREFIX: &str = "pixie";

/// Payload of state requests and OTA control messages.
pub const REQUEST_PAYLOAD: &str = "1";

/// Inbound topics a coordinator handles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InboundTopic {
    Status,
    Attributes,
    ChannelState,
    OtaReply,
}

/// The fixed topic set of one device channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topics {
    pub status: String,
    pub channel_state: String,
    pub channel_request: String,
    pub command: String,
    pub all_channels: String,
    pub attributes: String,
    pub attributes_request: String,
    pub ota_check: String,
    pub ota_perform: String,
    pub ota_reply: String,
}

impl Topics {
    pub fn new(identity: &DeviceIdentity) -> Self {
        let base = format!("{}_{}", TOPIC_PREFIX, identity.device_id());
        let channel = format!("{}/channel{}", base, identity.channel());

        Topics {
            status: format!("{base}/status"),
            channel_request: format!("{channel}/get"),
            command: format!("{channel}/set"),
            channel_state: channel,
            all_channels: format!("{base}/channel"),
            attributes: format!("{base}/attributes"),
            attributes_request: format!("{base}/attributes/get"),
            ota_check: format!("{base}/ota/check"),
            ota_perform: format!("{base}/ota/perform"),
            ota_reply: format!("{base}/ota"),
        }
    }

    /// Inbound topics in subscription order.
    pub fn subscriptions(&self) -> [(&str, InboundTopic); 4] {
        [
            (self.status.as_str(), InboundTopic::Status),
            (self.attributes.as_str(), InboundTopic::Attributes),
            (self.channel_state.as_str(), InboundTopic::ChannelState),
            (self.ota_reply.as_str(), InboundTopic::OtaReply),
        ]
    }

    pub fn classify(&self, topic: &str) -> Option<InboundTopic> {
        self.subscriptions()
            .into_iter()
            .find(|(t, _)| *t == topic)
            .map(|(_, kind)| kind)
    }
}

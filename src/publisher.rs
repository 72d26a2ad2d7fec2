// Edge-triggered command publishing
//
// A command goes out only for cycles that carry a non-zero intent, so idle
// polling never floods the channel. No retries: a stale teleop command is
// worse than a dropped one.

use tracing::debug;
use zenoh::key_expr::KeyExpr;
use zenoh::pubsub::Publisher;

use crate::config::ScaleConfig;
use crate::messages::{Twist, VelocityIntent};

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Failed to encode command: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(#[source] zenoh::Error),
}

/// Outbound channel for velocity commands
#[allow(async_fn_in_trait)]
pub trait CommandSink {
    async fn send(&self, cmd: &Twist) -> Result<(), PublishError>;
}

/// Zenoh-backed sink, JSON payloads
pub struct ZenohSink {
    publisher: Publisher<'static>,
}

impl ZenohSink {
    /// Declare a publisher for `topic` on an open session
    pub async fn declare(session: &zenoh::Session, topic: &str) -> Result<Self, PublishError> {
        let key_expr = KeyExpr::try_from(topic_to_key_expr(topic).to_string())
            .map_err(PublishError::Transport)?;
        let publisher = session
            .declare_publisher(key_expr)
            .await
            .map_err(PublishError::Transport)?;
        Ok(Self { publisher })
    }

    pub fn key_expr(&self) -> &KeyExpr<'static> {
        self.publisher.key_expr()
    }
}

impl CommandSink for ZenohSink {
    async fn send(&self, cmd: &Twist) -> Result<(), PublishError> {
        let payload = serde_json::to_string(cmd)?;
        self.publisher
            .put(payload)
            .await
            .map_err(PublishError::Transport)
    }
}

/// Zenoh key expressions may not start or end with '/'
pub fn topic_to_key_expr(topic: &str) -> &str {
    topic.trim_matches('/')
}

/// Scaled command for `intent`, or None when there is nothing to send
pub fn command_for(intent: VelocityIntent, scale: ScaleConfig) -> Option<Twist> {
    if intent.is_stop() {
        return None;
    }
    Some(Twist::planar(
        intent.linear * scale.linear_scale,
        intent.angular * scale.angular_scale,
    ))
}

pub struct CommandPublisher<S> {
    sink: S,
    scale: ScaleConfig,
}

impl<S: CommandSink> CommandPublisher<S> {
    pub fn new(sink: S, scale: ScaleConfig) -> Self {
        Self { sink, scale }
    }

    /// Publish the scaled command for a non-zero intent.
    /// Returns whether a message was sent.
    pub async fn publish_if_changed(&self, intent: VelocityIntent) -> Result<bool, PublishError> {
        let Some(cmd) = command_for(intent, self.scale) else {
            return Ok(false);
        };
        debug!(
            "Publishing linear.x={} angular.z={}",
            cmd.linear.x, cmd.angular.z
        );
        self.sink.send(&cmd).await?;
        Ok(true)
    }

    pub fn scale(&self) -> ScaleConfig {
        self.scale
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{FailingSink, RecordingSink};
    use super::*;

    #[test]
    fn test_command_for_zero_intent_is_none() {
        assert_eq!(command_for(VelocityIntent::STOP, ScaleConfig::default()), None);
    }

    #[test]
    fn test_command_for_scales_axes() {
        let scale = ScaleConfig::new(0.5, 2.0).unwrap();
        assert_eq!(
            command_for(VelocityIntent::BACKWARD, scale),
            Some(Twist::planar(-0.5, 0.0))
        );
        assert_eq!(
            command_for(VelocityIntent::TURN_RIGHT, scale),
            Some(Twist::planar(0.0, -2.0))
        );
    }

    #[tokio::test]
    async fn test_zero_intent_publishes_nothing() {
        let publisher = CommandPublisher::new(RecordingSink::default(), ScaleConfig::default());
        let sent = publisher.publish_if_changed(VelocityIntent::STOP).await.unwrap();
        assert!(!sent);
        assert!(publisher.sink().sent().is_empty());
    }

    #[tokio::test]
    async fn test_forward_unit_scale() {
        let publisher = CommandPublisher::new(RecordingSink::default(), ScaleConfig::default());
        assert!(publisher.publish_if_changed(VelocityIntent::FORWARD).await.unwrap());

        let sent = publisher.sink().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].linear.x, 1.0);
        assert_eq!(sent[0].angular.z, 0.0);
    }

    #[tokio::test]
    async fn test_left_with_custom_scale() {
        let scale = ScaleConfig::new(0.5, 2.0).unwrap();
        let publisher = CommandPublisher::new(RecordingSink::default(), scale);
        publisher.publish_if_changed(VelocityIntent::TURN_LEFT).await.unwrap();

        assert_eq!(publisher.sink().sent(), vec![Twist::planar(0.0, 2.0)]);
    }

    #[tokio::test]
    async fn test_one_message_per_non_zero_call() {
        let publisher = CommandPublisher::new(RecordingSink::default(), ScaleConfig::default());
        for intent in [
            VelocityIntent::FORWARD,
            VelocityIntent::STOP,
            VelocityIntent::FORWARD,
            VelocityIntent::STOP,
            VelocityIntent::TURN_RIGHT,
        ] {
            publisher.publish_if_changed(intent).await.unwrap();
        }
        assert_eq!(publisher.sink().sent().len(), 3);
    }

    #[tokio::test]
    async fn test_publish_failure_propagates() {
        let publisher = CommandPublisher::new(FailingSink, ScaleConfig::default());
        let err = publisher
            .publish_if_changed(VelocityIntent::FORWARD)
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Transport(_)));

        // Nothing to send means nothing to fail
        assert!(!publisher.publish_if_changed(VelocityIntent::STOP).await.unwrap());
    }

    #[test]
    fn test_topic_to_key_expr() {
        assert_eq!(topic_to_key_expr("/cmd_vel"), "cmd_vel");
        assert_eq!(topic_to_key_expr("robot/cmd_vel/"), "robot/cmd_vel");
        assert_eq!(topic_to_key_expr("lekiwi/cmd/base"), "lekiwi/cmd/base");
    }
}

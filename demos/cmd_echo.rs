// Command echo: subscribe to the teleop topic and log every Twist received
//
// Usage: cargo run --example cmd_echo -- [topic]
// Example: cargo run --example cmd_echo -- /cmd_vel

use keyboard_teleop::config::DEFAULT_TOPIC;
use keyboard_teleop::messages::Twist;
use keyboard_teleop::publisher::topic_to_key_expr;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let topic = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_TOPIC.to_string());
    let key_expr = topic_to_key_expr(&topic).to_string();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let subscriber = session.declare_subscriber(key_expr.clone()).await?;
    info!("Subscribed to: {}", key_expr);

    loop {
        let sample = subscriber.recv_async().await?;
        let payload = sample.payload().to_bytes();
        match serde_json::from_slice::<Twist>(&payload) {
            Ok(cmd) => info!(
                "linear.x={:+.3} angular.z={:+.3}",
                cmd.linear.x, cmd.angular.z
            ),
            Err(e) => warn!("Failed to parse command: {}", e),
        }
    }
}

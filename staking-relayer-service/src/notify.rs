use tracing::{info, warn};

use crate::config::Config;
use crate::dto::SlackNotificationData;

/// Posts an operator notification to the configured webhook. Jobs that
/// exhausted their retry budget end up here; delivery failures are only
/// logged, the pipeline never blocks on the messenger.
pub async fn post_notification(config: &Config, client: &reqwest::Client, text: &str) {
    if !config.slack_notification {
        return;
    }
    let (Some(webhook_url), Some(channel)) = (
        config.slack_webhook_url.as_ref(),
        config.slack_channel_id.as_ref(),
    ) else {
        warn!("Operator notifications enabled but webhook url/channel missing in config");
        return;
    };

    let payload = SlackNotificationData {
        channel: channel.to_owned(),
        text: text.to_owned(),
    };
    let response = client
        .post(webhook_url)
        .header("content-type", "application/json")
        .json(&payload)
        .send()
        .await;
    match response {
        Ok(resp) => match resp.status() {
            reqwest::StatusCode::OK => info!("Posted operator notification to {channel}"),
            status => warn!("Operator notification rejected with status {status}"),
        },
        Err(error) => warn!("Error posting operator notification: {error}"),
    }
}

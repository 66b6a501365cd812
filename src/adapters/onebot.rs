use crate::config::BotConfig;
use crate::event::{BotStatus, Context, Event, EventType, LoginUser, SendPacket};
use crate::plugins;
use futures_util::future::BoxFuture;
use futures_util::{Sink, SinkExt, StreamExt};
use http::HeaderValue;
use serde::Serialize;
use simd_json::derived::ValueObjectAccessAsScalar;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, protocol::Message as WsMessage},
};

pub type BotError = Box<dyn std::error::Error + Send + Sync>;

pub type TraitSink =
    Box<dyn Sink<WsMessage, Error = tokio_tungstenite::tungstenite::Error> + Send + Unpin>;
pub type LockedWriter = Arc<AsyncMutex<TraitSink>>;

const RECONNECT_DELAY: Duration = Duration::from_secs(3);

#[derive(Serialize)]
struct SendParamsInner<T> {
    message_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    group_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<i64>,
    message: T,
}

/// 适配器入口函数
pub fn entry(bot_config: BotConfig, base: Context) -> BoxFuture<'static, ()> {
    Box::pin(async move { run_bot_loop(bot_config, base).await })
}

/// OneBot 协议的主循环：断开或失败后 3 秒重连
pub async fn run_bot_loop(bot_config: BotConfig, base: Context) {
    let bot_url = bot_config
        .url
        .clone()
        .unwrap_or_else(|| "Unknown".to_string());
    loop {
        match connect_and_listen(&bot_config, &base).await {
            Ok(()) => warn!(target: "Bot", "Bot [{}] 连接断开，3秒后重连...", bot_url),
            Err(e) => {
                error!(target: "Bot", "Bot [{}] 连接失败: {}。3秒后重试...", bot_url, e)
            }
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

async fn connect_and_listen(config: &BotConfig, base: &Context) -> Result<(), BotError> {
    let url = config.url.as_deref().ok_or("OneBot URL 未配置")?;

    let mut request = url.into_client_request()?;
    if let Some(token) = &config.access_token
        && !token.is_empty()
    {
        let token_header = format!("Bearer {}", token);
        request
            .headers_mut()
            .insert("Authorization", HeaderValue::from_str(&token_header)?);
    }

    let (ws_stream, _) = connect_async(request).await?;
    info!(target: "Bot", "Bot [{}] 连接成功！(OneBot)", url);

    let (write_half, mut read_half) = ws_stream.split();
    let writer: LockedWriter = Arc::new(AsyncMutex::new(Box::new(write_half)));

    let bot = BotStatus {
        adapter: "onebot".to_string(),
        platform: "qq".to_string(),
        login_user: LoginUser {
            id: "0".to_string(),
            ..Default::default()
        },
    };

    while let Some(message) = read_half.next().await {
        match message {
            Ok(WsMessage::Text(text)) => {
                let mut data = text.as_bytes().to_vec();
                let writer = writer.clone();
                let base = base.clone();
                let bot = bot.clone();

                tokio::spawn(async move {
                    if let Err(e) = process_frame(&mut data, writer, &base, bot).await {
                        error!(target: "Bot", "Event processing error: {}", e);
                    }
                });
            }
            Ok(WsMessage::Close(_)) => return Ok(()),
            Err(e) => return Err(Box::new(e)),
            _ => {}
        }
    }
    Ok(())
}

/// 解析一帧事件并送入插件流水线；非 JSON 帧与 API 响应直接忽略
pub async fn process_frame(
    data: &mut [u8],
    writer: LockedWriter,
    base: &Context,
    mut bot: BotStatus,
) -> Result<(), BotError> {
    let event: Event = match simd_json::to_owned_value(data) {
        Ok(v) => v,
        Err(_) => return Ok(()),
    };

    // 没有 post_type 的是动作回执
    if event.get_str("post_type").is_none() {
        debug!(target: "Bot", "忽略非事件帧");
        return Ok(());
    }

    if let Some(self_id) = event.get_i64("self_id").filter(|&id| id != 0) {
        bot.login_user.id = self_id.to_string();
    }

    let mut ctx = base.with_event(EventType::Onebot(event));
    ctx.bot = bot;

    plugins::run(ctx, writer).await?;
    Ok(())
}

/// 发送消息：有群号时发往群聊，否则私聊；发送前经过 BeforeSend 流水线
pub async fn send_msg<M>(
    ctx: &Context,
    writer: LockedWriter,
    group_id: Option<i64>,
    user_id: Option<i64>,
    message: M,
) -> Result<(), BotError>
where
    M: Serialize,
{
    let Some(packet) = build_send_packet(group_id, user_id, message)? else {
        return Ok(());
    };

    let new_ctx = ctx.with_event(EventType::BeforeSend(packet));
    plugins::run(new_ctx, writer).await?;
    Ok(())
}

fn build_send_packet<M: Serialize>(
    group_id: Option<i64>,
    user_id: Option<i64>,
    message: M,
) -> Result<Option<SendPacket>, BotError> {
    let (msg_type, target_group, target_user) = if let Some(gid) = group_id.filter(|&id| id != 0) {
        ("group", Some(gid), None)
    } else if let Some(uid) = user_id.filter(|&id| id != 0) {
        ("private", None, Some(uid))
    } else {
        return Ok(None);
    };

    let params = SendParamsInner {
        message_type: msg_type,
        group_id: target_group,
        user_id: target_user,
        message,
    };

    let mut json_bytes = simd_json::to_vec(&params)?;
    let params_val = simd_json::to_owned_value(&mut json_bytes)?;

    Ok(Some(SendPacket {
        action: "send_msg".to_string(),
        params: params_val,
    }))
}

pub async fn send_frame_raw(writer: LockedWriter, json_str: String) -> Result<(), BotError> {
    let mut guard = writer.lock().await;
    guard.send(WsMessage::Text(json_str.into())).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use simd_json::derived::ValueObjectAccess;

    #[test]
    fn group_takes_priority() {
        let packet = build_send_packet(Some(42), Some(7), "hi").unwrap().unwrap();
        assert_eq!(packet.action, "send_msg");
        assert_eq!(packet.params.get_i64("group_id"), Some(42));
        assert_eq!(packet.params.get_str("message_type"), Some("group"));
        assert_eq!(packet.params.get_i64("user_id"), None);
    }

    #[test]
    fn falls_back_to_private() {
        let packet = build_send_packet(Some(0), Some(7), Message::new().text("x"))
            .unwrap()
            .unwrap();
        assert_eq!(packet.params.get_str("message_type"), Some("private"));
        assert_eq!(packet.params.get_i64("user_id"), Some(7));
        assert!(packet.params.get("message").is_some());
    }

    #[test]
    fn no_target_sends_nothing() {
        assert!(build_send_packet(None, None, "x").unwrap().is_none());
    }
}

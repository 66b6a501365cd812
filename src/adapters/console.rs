use crate::adapters::onebot::{LockedWriter, process_frame};
use crate::config::BotConfig;
use crate::event::{BotStatus, Context as BotContext, LoginUser};
use crate::message::Message;
use base64::{Engine as _, engine::general_purpose};
use futures_util::Sink;
use futures_util::future::BoxFuture;
use serde::Serialize;
use simd_json::OwnedValue;
use simd_json::base::{ValueAsArray, ValueAsScalar};
use simd_json::derived::{ValueObjectAccess, ValueObjectAccessAsScalar};
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::task::{Context, Poll};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex as AsyncMutex;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};

const CONSOLE_USER_ID: i64 = 1;
const CONSOLE_GROUP_ID: i64 = 10000;

// ================= 模拟数据结构 =================

#[derive(Serialize)]
struct MockSender {
    user_id: i64,
    nickname: String,
    card: String,
}

#[derive(Serialize)]
struct MockMessageEvent {
    post_type: &'static str,
    message_type: &'static str,
    time: u64,
    self_id: i64,
    sub_type: &'static str,
    group_id: i64,
    user_id: i64,
    message_id: i32,
    sender: MockSender,
    raw_message: String,
    message: Message,
}

fn mock_event(line: &str, timestamp: u64) -> MockMessageEvent {
    MockMessageEvent {
        post_type: "message",
        message_type: "group",
        time: timestamp,
        self_id: 0,
        sub_type: "normal",
        group_id: CONSOLE_GROUP_ID,
        user_id: CONSOLE_USER_ID,
        message_id: timestamp as i32,
        sender: MockSender {
            user_id: CONSOLE_USER_ID,
            nickname: "ConsoleUser".to_string(),
            card: String::new(),
        },
        raw_message: line.to_string(),
        message: Message::new().text(line),
    }
}

// ================= 适配器逻辑 =================

/// 控制台适配器入口：标准输入的每一行作为一条群消息
pub fn entry(_bot_config: BotConfig, base: BotContext) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        info!(target: "Console", "已启动控制台模式。请输入指令 (例如: /stats.rank 本周)");
        info!(
            target: "Console",
            "模拟环境: User ID: {} | Group ID: {}",
            CONSOLE_USER_ID,
            CONSOLE_GROUP_ID
        );

        let stdin = tokio::io::stdin();
        let mut reader = BufReader::new(stdin).lines();

        // 模拟的 Writer，将 Bot 回复打印到控制台
        let writer: LockedWriter = Arc::new(AsyncMutex::new(Box::new(ConsoleSink::default())));

        let bot_status = BotStatus {
            adapter: "console".to_string(),
            platform: "console".to_string(),
            login_user: LoginUser {
                id: "0".to_string(),
                name: Some("ConsoleBot".to_string()),
                nick: Some("ConsoleBot".to_string()),
                avatar: None,
            },
        };

        while let Ok(Some(line)) = reader.next_line().await {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let timestamp = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default();

            let mut json_bytes = match simd_json::to_vec(&mock_event(line, timestamp)) {
                Ok(b) => b,
                Err(e) => {
                    warn!(target: "Console", "构造模拟消息失败: {}", e);
                    continue;
                }
            };

            if let Err(e) =
                process_frame(&mut json_bytes, writer.clone(), &base, bot_status.clone()).await
            {
                warn!(target: "Console", "处理消息时出错: {}", e);
            }
        }
    })
}

/// 把发出的动作打印到终端，图片另存为临时文件
#[derive(Default)]
struct ConsoleSink {
    images: AtomicU32,
}

impl ConsoleSink {
    fn render_message(&self, message: &OwnedValue) -> String {
        if let Some(s) = message.as_str() {
            return s.to_string();
        }
        let Some(segments) = message.as_array() else {
            return format!("{:?}", message);
        };

        let mut out = String::new();
        for seg in segments {
            let data = seg.get("data");
            match seg.get_str("type") {
                Some("text") => out.push_str(data.and_then(|d| d.get_str("text")).unwrap_or("")),
                Some("image") => {
                    let file = data.and_then(|d| d.get_str("file")).unwrap_or("");
                    out.push_str(&self.save_image(file));
                }
                Some(other) => out.push_str(&format!("[{}]", other)),
                None => {}
            }
        }
        out
    }

    fn save_image(&self, file: &str) -> String {
        let Some(encoded) = file.strip_prefix("base64://") else {
            return format!("[图片 {}]", file);
        };
        let bytes = match general_purpose::STANDARD.decode(encoded) {
            Ok(b) => b,
            Err(e) => return format!("[图片 解码失败: {}]", e),
        };

        let n = self.images.fetch_add(1, Ordering::Relaxed);
        let path: PathBuf = std::env::temp_dir().join(format!(
            "ayjx-stats-{}-{}.png",
            std::process::id(),
            n
        ));
        match std::fs::write(&path, &bytes) {
            Ok(()) => format!("[图片 {} KB → {}]", bytes.len() / 1024, path.display()),
            Err(e) => format!("[图片 {} KB，保存失败: {}]", bytes.len() / 1024, e),
        }
    }
}

impl Sink<WsMessage> for ConsoleSink {
    type Error = WsError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, item: WsMessage) -> Result<(), Self::Error> {
        let WsMessage::Text(text) = item else {
            return Ok(());
        };

        let mut data = text.as_bytes().to_vec();
        let Ok(val) = simd_json::to_owned_value(&mut data) else {
            println!("\x1b[36m[Bot Raw] > \x1b[0m{}", text.as_str());
            return Ok(());
        };

        match (val.get_str("action"), val.get("params").and_then(|p| p.get("message"))) {
            (Some("send_msg" | "send_private_msg" | "send_group_msg"), Some(message)) => {
                println!("\x1b[36m[Bot Reply] > \x1b[0m{}", self.render_message(message));
            }
            (action, _) => {
                println!("\x1b[90m[API Call] > {}\x1b[0m", action.unwrap_or("unknown"));
            }
        }
        Ok(())
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }
}

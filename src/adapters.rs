use crate::config::BotConfig;
use crate::event::Context;
use futures_util::future::BoxFuture;
use std::sync::OnceLock;

pub mod console;
pub mod onebot;

/// 适配器处理函数签名
///
/// `base` 是一个 Init 事件的上下文，携带共享的配置与服务，
/// 适配器收到事件时通过 [`Context::with_event`] 派生。
pub type AdapterHandler = fn(BotConfig, Context) -> BoxFuture<'static, ()>;

/// 适配器定义
pub struct Adapter {
    /// 协议名称 (如 "onebot")，在配置文件中通过 protocol 字段指定
    pub protocol: &'static str,
    /// 启动处理函数
    pub handler: AdapterHandler,
}

static ADAPTERS: OnceLock<Vec<Adapter>> = OnceLock::new();

/// 获取所有注册的适配器
pub fn get_adapters() -> &'static [Adapter] {
    ADAPTERS.get_or_init(|| {
        vec![
            Adapter {
                protocol: "onebot",
                handler: onebot::entry,
            },
            // 控制台适配器 (用于本地调试)
            Adapter {
                protocol: "console",
                handler: console::entry,
            },
        ]
    })
}

/// 根据协议名称查找适配器
pub fn find_adapter(protocol: &str) -> Option<&'static Adapter> {
    get_adapters().iter().find(|a| a.protocol == protocol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_protocol() {
        assert!(find_adapter("onebot").is_some());
        assert!(find_adapter("console").is_some());
        assert!(find_adapter("satori").is_none());
    }
}

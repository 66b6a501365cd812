use crate::adapters::onebot::{LockedWriter, send_frame_raw};
use crate::config::AppConfig;
use crate::event::{Context, EventType};
use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::sync::OnceLock;
use toml::Value;

pub mod echarts;
pub mod stats;

pub type PluginError = Box<dyn std::error::Error + Send + Sync>;

pub type PluginHandler =
    fn(Context, LockedWriter) -> BoxFuture<'static, Result<Option<Context>, PluginError>>;

pub struct Plugin {
    pub name: &'static str,
    pub handler: PluginHandler,
    pub default_config: fn() -> Value,
}

static PLUGINS: OnceLock<Vec<Plugin>> = OnceLock::new();

/// 获取全局插件列表 (按顺序组成流水线)
pub fn get_plugins() -> &'static [Plugin] {
    PLUGINS.get_or_init(|| {
        vec![
            Plugin {
                name: "echarts",
                handler: echarts::handle,
                default_config: echarts::default_config,
            },
            Plugin {
                name: "stats",
                handler: stats::handle,
                default_config: stats::default_config,
            },
        ]
    })
}

/// 各插件的默认配置，用于补全配置文件
pub fn default_configs() -> impl Iterator<Item = (&'static str, Value)> {
    get_plugins()
        .iter()
        .map(|p| (p.name, (p.default_config)()))
}

fn enabled_plugins(config: &AppConfig) -> HashSet<&'static str> {
    get_plugins()
        .iter()
        .filter(|p| config.is_plugin_enabled(p.name))
        .map(|p| p.name)
        .collect()
}

/// 输出插件加载情况
pub fn report(config: &AppConfig) {
    let plugins = get_plugins();
    let enabled = enabled_plugins(config);

    info!(
        target: "System",
        "正在加载插件系统 (已启用 {}/{})",
        enabled.len(),
        plugins.len()
    );
    for plugin in plugins {
        if enabled.contains(plugin.name) {
            info!(target: "Plugin", "✅ [{}] 就绪", plugin.name);
        } else {
            debug!(target: "Plugin", "[{}] 未启用", plugin.name);
        }
    }
}

/// 运行插件流水线
pub async fn run(mut ctx: Context, writer: LockedWriter) -> Result<(), PluginError> {
    let enabled = {
        let guard = ctx.config.read().map_err(|e| e.to_string())?;
        enabled_plugins(&guard)
    };

    for plugin in get_plugins() {
        if !enabled.contains(plugin.name) {
            continue;
        }

        match (plugin.handler)(ctx, writer.clone()).await? {
            Some(next_ctx) => {
                ctx = next_ctx;
            }
            None => return Ok(()),
        }
    }

    match ctx.event {
        EventType::Onebot(_) => {}
        EventType::BeforeSend(packet) => {
            let json_str = simd_json::to_string(&packet)?;
            send_frame_raw(writer, json_str).await?;
        }
        EventType::Init => {}
    }

    Ok(())
}

/// 读取插件配置块；缺失或格式不符时返回 None
pub fn get_config<T>(ctx: &Context, plugin_name: &str) -> Option<T>
where
    T: DeserializeOwned,
{
    let guard = ctx.config.read().ok()?;
    guard
        .plugins
        .get(plugin_name)
        .and_then(|v| T::deserialize(v.clone()).ok())
}

#[macro_use]
mod log;

mod adapters;
mod chart;
mod command;
mod config;
mod daterange;
mod event;
mod message;
mod plugins;
mod query;

use chart::ChartService;
use config::AppConfig;
use event::{BotStatus, Context, EventType};
use plugins::echarts::EChartsConfig;
use plugins::stats::StatsConfig;
use query::QueryClient;
use std::sync::{Arc, RwLock};
use std::time::Duration;

type MainError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), MainError> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    // 1. 加载配置并补全插件默认配置
    let mut app_config = AppConfig::load(&config_path).await?;
    log::set_debug(app_config.debug);

    if app_config.merge_plugin_defaults(plugins::default_configs()) {
        app_config.save(&config_path).await?;
        info!(target: "Config", "配置文件已更新: {}", config_path);
    }

    // 2. 构建图表与查询服务
    let echarts_config: EChartsConfig = plugin_config(&app_config, "echarts");
    let stats_config: StatsConfig = plugin_config(&app_config, "stats");

    let charts = Arc::new(ChartService::new(echarts_config).await?);
    let query = Arc::new(QueryClient::new(
        &stats_config.endpoint,
        Duration::from_secs(stats_config.timeout_secs),
    )?);
    info!(target: "System", "查询服务: {}", query.endpoint());

    plugins::report(&app_config);

    let bots = app_config.bots.clone();
    let base = Context {
        event: EventType::Init,
        config: Arc::new(RwLock::new(app_config)),
        config_path,
        charts,
        query,
        bot: BotStatus {
            adapter: "system".to_string(),
            platform: "internal".to_string(),
            login_user: Default::default(),
        },
    };

    // 3. 启动适配器
    let mut started = 0;
    for bot in bots.into_iter().filter(|b| b.enabled) {
        let Some(adapter) = adapters::find_adapter(&bot.protocol) else {
            warn!(target: "System", "未知的协议类型: {}", bot.protocol);
            continue;
        };
        tokio::spawn((adapter.handler)(bot, base.clone()));
        started += 1;
    }

    if started == 0 {
        warn!(target: "System", "没有启用任何 Bot，请检查配置文件 {}", base.config_path);
    }

    tokio::signal::ctrl_c().await?;
    info!(target: "System", "收到退出信号，正在关闭...");
    Ok(())
}

/// 读取插件配置，缺失或格式错误时回退到默认值
fn plugin_config<T>(config: &AppConfig, name: &str) -> T
where
    T: serde::de::DeserializeOwned + Default,
{
    match config.plugins.get(name).cloned().map(T::deserialize) {
        Some(Ok(cfg)) => cfg,
        Some(Err(e)) => {
            warn!(target: "Config", "插件 [{}] 配置格式错误，使用默认值: {}", name, e);
            T::default()
        }
        None => T::default(),
    }
}

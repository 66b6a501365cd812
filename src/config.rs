use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;
use toml::Value;

pub type ConfigError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    // 全局指令前缀（支持多个，如 ["/", "#"]）
    #[serde(default = "default_prefix")]
    pub command_prefix: Vec<String>,

    // 是否输出 Debug 日志
    #[serde(default)]
    pub debug: bool,

    // Bot 连接配置
    #[serde(default = "default_bots")]
    pub bots: Vec<BotConfig>,

    // 插件配置
    #[serde(flatten)]
    pub plugins: HashMap<String, Value>,
}

impl AppConfig {
    /// 读取配置文件；文件不存在时返回默认配置
    pub async fn load(path: &str) -> Result<Self, ConfigError> {
        if !Path::new(path).exists() {
            info!(target: "Config", "未找到配置文件 {}，使用默认配置", path);
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).await?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub async fn save(&self, path: &str) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path, toml_string).await?;
        Ok(())
    }

    /// 为缺失配置块的插件写入默认配置，返回是否有改动
    pub fn merge_plugin_defaults<'a, I>(&mut self, defaults: I) -> bool
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        let mut modified = false;
        for (name, value) in defaults {
            if !self.plugins.contains_key(name) {
                info!(target: "Config", "+ 初始化插件配置: {}", name);
                self.plugins.insert(name.to_string(), value);
                modified = true;
            }
        }
        modified
    }

    /// 插件是否启用 (配置块中 enabled = true)
    pub fn is_plugin_enabled(&self, name: &str) -> bool {
        self.plugins
            .get(name)
            .and_then(|v| v.get("enabled"))
            .and_then(|x| x.as_bool())
            .unwrap_or(false)
    }
}

fn default_prefix() -> Vec<String> {
    vec!["/".to_string()]
}

fn default_bots() -> Vec<BotConfig> {
    vec![
        // 控制台适配器：保持简洁，仅需启用
        BotConfig {
            enabled: true,
            protocol: "console".to_string(),
            url: None,
            access_token: None,
        },
        // OneBot 适配器：生成配置占位符，默认禁用以防误连
        BotConfig {
            enabled: false,
            protocol: "onebot".to_string(),
            url: Some("ws://127.0.0.1:3001".to_string()),
            access_token: Some("YOUR_TOKEN_HERE".to_string()),
        },
    ]
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BotConfig {
    // 是否启用此 Bot
    #[serde(default = "default_true")]
    pub enabled: bool,

    // 协议类型 (例如 "onebot")
    #[serde(default = "default_protocol")]
    pub protocol: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_protocol() -> String {
    "onebot".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            command_prefix: default_prefix(),
            debug: false,
            bots: default_bots(),
            plugins: HashMap::new(),
        }
    }
}

/// 辅助函数：构建默认配置 Value，并确保包含 enabled 字段
pub fn build_config<T: Serialize>(data: T) -> Value {
    let mut val = Value::try_from(data).unwrap_or(Value::Table(Default::default()));
    if let Value::Table(ref mut map) = val
        && !map.contains_key("enabled")
    {
        map.insert("enabled".to_string(), Value::Boolean(true));
    }
    val
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Sample {
        width: u32,
    }

    #[test]
    fn build_config_inserts_enabled() {
        let val = build_config(Sample { width: 10 });
        assert_eq!(val.get("enabled").and_then(|v| v.as_bool()), Some(true));
        assert_eq!(val.get("width").and_then(|v| v.as_integer()), Some(10));
    }

    #[test]
    fn plugin_tables_are_flattened() {
        let raw = r##"
            command_prefix = ["#"]
            debug = true

            [[bots]]
            protocol = "console"

            [stats]
            enabled = true
            endpoint = "http://prom:9090"

            [echarts]
            enabled = false
        "##;
        let cfg: AppConfig = toml::from_str(raw).unwrap();
        assert_eq!(cfg.command_prefix, vec!["#".to_string()]);
        assert!(cfg.debug);
        assert_eq!(cfg.bots.len(), 1);
        assert!(cfg.bots[0].enabled);
        assert!(cfg.is_plugin_enabled("stats"));
        assert!(!cfg.is_plugin_enabled("echarts"));
        assert!(!cfg.is_plugin_enabled("missing"));
    }

    #[test]
    fn merge_only_adds_missing_tables() {
        let mut cfg = AppConfig::default();
        cfg.plugins.insert(
            "stats".to_string(),
            build_config(Sample { width: 1 }),
        );

        let changed = cfg.merge_plugin_defaults([
            ("stats", build_config(Sample { width: 2 })),
            ("echarts", build_config(Sample { width: 3 })),
        ]);

        assert!(changed);
        let stats_width = cfg.plugins["stats"].get("width").and_then(|v| v.as_integer());
        assert_eq!(stats_width, Some(1));
        assert!(cfg.plugins.contains_key("echarts"));
        assert!(!cfg.merge_plugin_defaults([("echarts", build_config(Sample { width: 4 }))]));
    }
}

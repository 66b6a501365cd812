use crate::adapters::onebot::{LockedWriter, send_msg};
use crate::chart::options::demo_option;
use crate::command::{OptionKind, OptionSpec, ParsedArgs, match_command, parse_options};
use crate::config::build_config;
use crate::event::Context;
use crate::message::Message;
use crate::plugins::PluginError;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use toml::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EChartsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// 单边像素上限
    #[serde(default = "default_max_size")]
    pub max_size: u32,
    /// 主题 JSON 目录，文件名即主题名
    #[serde(default = "default_themes_dir")]
    pub themes_dir: String,
    #[serde(default = "default_theme")]
    pub default_theme: String,
    /// 头像缓存目录，留空则不缓存
    #[serde(default = "default_avatar_dir")]
    pub avatar_dir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_width() -> u32 {
    1000
}

fn default_height() -> u32 {
    700
}

fn default_max_size() -> u32 {
    4096
}

fn default_themes_dir() -> String {
    "data/echarts/themes".to_string()
}

fn default_theme() -> String {
    "light".to_string()
}

fn default_avatar_dir() -> String {
    "data/echarts/avatars".to_string()
}

impl Default for EChartsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            width: default_width(),
            height: default_height(),
            max_size: default_max_size(),
            themes_dir: default_themes_dir(),
            default_theme: default_theme(),
            avatar_dir: default_avatar_dir(),
            font_path: None,
            font_family: None,
        }
    }
}

pub fn default_config() -> Value {
    build_config(EChartsConfig::default())
}

const OPTIONS: [OptionSpec; 3] = [
    OptionSpec::new("width", 'w', OptionKind::PosInt),
    OptionSpec::new("height", 't', OptionKind::PosInt),
    OptionSpec::new("theme", 'm', OptionKind::Text),
];

pub fn handle(
    ctx: Context,
    writer: LockedWriter,
) -> BoxFuture<'static, Result<Option<Context>, PluginError>> {
    Box::pin(async move {
        let Some(cmd) = match_command(&ctx, "echarts") else {
            return Ok(Some(ctx));
        };
        let Some(msg) = ctx.as_message() else {
            return Ok(Some(ctx));
        };
        let group_id = msg.group_id();
        let user_id = msg.user_id();

        let args = match parse_options(&cmd.text, &OPTIONS) {
            Ok(a) => a,
            Err(e) => {
                send_msg(&ctx, writer, group_id, Some(user_id), e).await?;
                return Ok(None);
            }
        };

        let (width, height) = match chart_size(&args) {
            Ok(size) => size,
            Err(e) => {
                send_msg(&ctx, writer, group_id, Some(user_id), e).await?;
                return Ok(None);
            }
        };

        let theme = args.get("theme");
        if let Some(name) = theme
            && !ctx.charts.has_theme(name)
        {
            warn!(
                target: "Plugin/ECharts",
                "未知主题 {}，使用默认主题 (可用: {})",
                name,
                ctx.charts.theme_names().join(", ")
            );
        }

        let reply = match ctx
            .charts
            .create_chart_png(width, height, demo_option(), theme)
            .await
        {
            Ok(png) => Message::new().png(&png),
            Err(e) => {
                error!(target: "Plugin/ECharts", "演示图表生成失败: {:#}", e);
                Message::new().text(format!("生成失败: {}", e))
            }
        };

        send_msg(&ctx, writer, group_id, Some(user_id), reply).await?;
        Ok(None)
    })
}

fn chart_size(args: &ParsedArgs) -> Result<(Option<u32>, Option<u32>), String> {
    let side = |name: &str| {
        args.get_u64(name)
            .map(|v| u32::try_from(v).map_err(|_| format!("选项 {} 的值过大: {}", name, v)))
            .transpose()
    };
    Ok((side("width")?, side("height")?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg: EChartsConfig = toml::from_str("enabled = true\nwidth = 640").unwrap();
        assert_eq!(cfg.width, 640);
        assert_eq!(cfg.height, 700);
        assert_eq!(cfg.default_theme, "light");
        assert_eq!(cfg.themes_dir, "data/echarts/themes");
        assert!(cfg.font_path.is_none());
    }

    #[test]
    fn default_config_round_trips() {
        let value = default_config();
        assert_eq!(value.get("enabled").and_then(|v| v.as_bool()), Some(true));
        let cfg: EChartsConfig = EChartsConfig::deserialize(value).unwrap();
        assert_eq!((cfg.width, cfg.height), (1000, 700));
    }

    #[test]
    fn size_flags() {
        let args = parse_options("-w 640 -t 480", &OPTIONS).unwrap();
        assert_eq!(args.get_u64("width"), Some(640));
        assert_eq!(args.get_u64("height"), Some(480));
        assert!(parse_options("-w 0", &OPTIONS).is_err());
    }

    #[test]
    fn oversized_flags_are_not_truncated() {
        let args = parse_options("-w 4294967297", &OPTIONS).unwrap();
        assert!(chart_size(&args).is_err());

        let args = parse_options("-t 480", &OPTIONS).unwrap();
        assert_eq!(chart_size(&args), Ok((None, Some(480))));
    }
}

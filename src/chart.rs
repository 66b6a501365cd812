pub mod avatar;
pub mod font;
pub mod month;
pub mod options;
pub mod renderer;
pub mod theme;
pub mod utils;

use crate::plugins::echarts::EChartsConfig;
use anyhow::{Context as _, bail};
use options::{ChartKind, ChartOption, TextStyle};
use renderer::Canvas;
use std::path::{Path, PathBuf};
use theme::ThemeRegistry;

const DEFAULT_FONT_SIZE: u32 = 18;

/// 图表服务：持有主题与字体，把 [`ChartOption`] 渲染成 PNG
pub struct ChartService {
    config: EChartsConfig,
    themes: ThemeRegistry,
    font_family: String,
    avatar_dir: Option<PathBuf>,
}

impl ChartService {
    pub async fn new(config: EChartsConfig) -> anyhow::Result<Self> {
        let source = font::init_preset_font(config.font_path.as_deref(), config.font_family.as_deref());
        match &source {
            Some(src) => info!(target: "Chart", "预设字体已加载: {}", src),
            None => warn!(target: "Chart", "未找到可用字体，图表将不包含文字"),
        }

        let mut themes = ThemeRegistry::new(&config.default_theme);
        match themes.load_dir(Path::new(&config.themes_dir)).await {
            Ok(n) => debug!(target: "Chart", "已从 {} 加载 {} 个主题", config.themes_dir, n),
            Err(e) => warn!(target: "Chart", "加载主题目录 {} 失败: {}", config.themes_dir, e),
        }

        let avatar_dir = Some(config.avatar_dir.as_str())
            .filter(|d| !d.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            config,
            themes,
            font_family: font::PRESET_FAMILY.to_string(),
            avatar_dir,
        })
    }

    pub fn theme_names(&self) -> Vec<&str> {
        self.themes.names()
    }

    pub fn has_theme(&self, name: &str) -> bool {
        self.theme_names().contains(&name)
    }

    /// 渲染图表为 PNG 字节
    ///
    /// 宽高缺省时取配置值；未设置全局文字样式时使用预设字体 18 号。
    pub async fn create_chart_png(
        &self,
        width: Option<u32>,
        height: Option<u32>,
        mut option: ChartOption,
        theme: Option<&str>,
    ) -> anyhow::Result<Vec<u8>> {
        let width = width.unwrap_or(self.config.width);
        let height = height.unwrap_or(self.config.height);
        if width == 0 || height == 0 {
            bail!("图表宽高必须为正数 (当前 {}x{})", width, height);
        }
        let max = self.config.max_size;
        if width > max || height > max {
            bail!("图表宽高不能超过 {} (当前 {}x{})", max, width, height);
        }

        if option.text_style.is_none() {
            option.text_style = Some(TextStyle {
                font_family: Some(self.font_family.clone()),
                font_size: Some(DEFAULT_FONT_SIZE),
                color: None,
            });
        }

        // 先把图表引用的图片取回来，绘制过程是同步的
        let avatars = match &option.kind {
            ChartKind::Rank(rank) => avatar::load_avatars(&rank.avatars, self.avatar_dir.as_deref()).await,
            _ => Vec::new(),
        };

        let theme = self.themes.get(theme);
        debug!(
            target: "Chart",
            "渲染图表 {}x{} (头像 {} 个)",
            width,
            height,
            avatars.iter().filter(|a| a.is_some()).count()
        );

        // 绘图是 CPU 密集型任务，放到阻塞线程池
        let theme = theme.clone();
        tokio::task::spawn_blocking(move || {
            let canvas = Canvas {
                width,
                height,
                theme: &theme,
                avatars: &avatars,
            };
            renderer::render_png(&option, &canvas)
        })
        .await
        .context("绘图任务异常退出")?
        .map_err(anyhow::Error::msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use options::{RankRow, demo_option, rank_option};

    fn config() -> EChartsConfig {
        let dir = std::env::temp_dir().join(format!("ayjx-stats-service-{}", std::process::id()));
        EChartsConfig {
            width: 320,
            height: 200,
            themes_dir: dir.join("themes").to_string_lossy().into_owned(),
            avatar_dir: String::new(),
            ..EChartsConfig::default()
        }
    }

    #[tokio::test]
    async fn uses_configured_size_by_default() {
        let service = ChartService::new(config()).await.unwrap();
        let png = service.create_chart_png(None, None, demo_option(), None).await.unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!((img.width(), img.height()), (320, 200));

        let png = service
            .create_chart_png(Some(640), Some(120), demo_option(), Some("dark"))
            .await
            .unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!((img.width(), img.height()), (640, 120));
    }

    #[tokio::test]
    async fn zero_size_is_rejected() {
        let service = ChartService::new(config()).await.unwrap();
        let err = service
            .create_chart_png(Some(0), None, demo_option(), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("正数"));
    }

    #[tokio::test]
    async fn oversized_canvas_is_rejected() {
        let service = ChartService::new(config()).await.unwrap();
        let err = service
            .create_chart_png(Some(100_000), Some(100_000), demo_option(), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("4096"), "{}", err);

        let png = service
            .create_chart_png(Some(4096), Some(300), demo_option(), None)
            .await;
        assert!(png.is_ok());
    }

    #[tokio::test]
    async fn rank_without_avatars_renders() {
        let service = ChartService::new(config()).await.unwrap();
        let rows = vec![RankRow::new("a", 3.0), RankRow::new("b", 1.0)];
        let png = service
            .create_chart_png(Some(600), Some(300), rank_option("rank", &rows), None)
            .await
            .unwrap();
        assert!(!png.is_empty());
        assert!(service.theme_names().contains(&"light"));
    }
}

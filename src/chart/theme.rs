use super::utils::parse_color;
use plotters::style::RGBColor;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;

/// 绘图时使用的主题色
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub background: RGBColor,
    pub palette: Vec<RGBColor>,
    pub text: RGBColor,
    pub title: RGBColor,
    pub axis_line: RGBColor,
    pub split_line: RGBColor,
}

impl Theme {
    pub fn light() -> Self {
        Self {
            background: RGBColor(255, 255, 255),
            palette: hex_palette(&[
                "#5470c6", "#91cc75", "#fac858", "#ee6666", "#73c0de", "#3ba272", "#fc8452",
                "#9a60b4", "#ea7ccc",
            ]),
            text: RGBColor(0x33, 0x33, 0x33),
            title: RGBColor(0x46, 0x46, 0x46),
            axis_line: RGBColor(0x6e, 0x70, 0x79),
            split_line: RGBColor(0xe0, 0xe6, 0xf1),
        }
    }

    pub fn dark() -> Self {
        Self {
            background: RGBColor(0x10, 0x0c, 0x2a),
            palette: hex_palette(&[
                "#4992ff", "#7cffb2", "#fddd60", "#ff6e76", "#58d9f9", "#05c091", "#ff8a45",
                "#8d48e3", "#dd79ff",
            ]),
            text: RGBColor(0xb9, 0xb8, 0xce),
            title: RGBColor(0xee, 0xf1, 0xfa),
            axis_line: RGBColor(0xb9, 0xb8, 0xce),
            split_line: RGBColor(0x48, 0x47, 0x53),
        }
    }

    pub fn pick(&self, idx: usize) -> RGBColor {
        if self.palette.is_empty() {
            return self.text;
        }
        self.palette[idx % self.palette.len()]
    }

    /// 以当前主题为底，覆盖主题文件中出现的字段
    fn merged_with(mut self, file: &ThemeFile) -> Self {
        if let Some(c) = file.background_color.as_deref().and_then(parse_color) {
            self.background = c;
        }
        if let Some(colors) = &file.color {
            let palette: Vec<RGBColor> = colors.iter().filter_map(|c| parse_color(c)).collect();
            if !palette.is_empty() {
                self.palette = palette;
            }
        }
        if let Some(c) = file.text_style.color.as_deref().and_then(parse_color) {
            self.text = c;
        }
        if let Some(c) = file.title.text_style.color.as_deref().and_then(parse_color) {
            self.title = c;
        }
        for axis in [&file.value_axis, &file.category_axis] {
            if let Some(c) = axis.axis_line.line_style.color.as_deref().and_then(parse_color) {
                self.axis_line = c;
            }
            if let Some(c) = axis.split_line.line_style.color.as_deref().and_then(parse_color) {
                self.split_line = c;
            }
        }
        self
    }
}

fn hex_palette(colors: &[&str]) -> Vec<RGBColor> {
    colors.iter().filter_map(|c| parse_color(c)).collect()
}

// 主题编辑器导出的 JSON 只取用到的字段
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ThemeFile {
    background_color: Option<String>,
    color: Option<Vec<String>>,
    text_style: ColorOnly,
    title: TitleSection,
    value_axis: AxisSection,
    category_axis: AxisSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ColorOnly {
    color: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TitleSection {
    text_style: ColorOnly,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LineSection {
    line_style: ColorOnly,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct AxisSection {
    axis_line: LineSection,
    split_line: LineSection,
}

pub fn parse_theme(json: &str) -> Result<Theme, serde_json::Error> {
    let file: ThemeFile = serde_json::from_str(json)?;
    Ok(Theme::light().merged_with(&file))
}

pub struct ThemeRegistry {
    themes: HashMap<String, Theme>,
    default_theme: String,
    fallback: Theme,
}

impl ThemeRegistry {
    pub fn new(default_theme: &str) -> Self {
        let mut themes = HashMap::new();
        themes.insert("light".to_string(), Theme::light());
        themes.insert("dark".to_string(), Theme::dark());
        Self {
            themes,
            default_theme: default_theme.to_string(),
            fallback: Theme::light(),
        }
    }

    pub fn register(&mut self, name: &str, theme: Theme) {
        self.themes.insert(name.to_string(), theme);
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.themes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// 查找主题：未知名称回退到默认主题，再回退到 light
    pub fn get(&self, name: Option<&str>) -> &Theme {
        name.and_then(|n| self.themes.get(n))
            .or_else(|| self.themes.get(&self.default_theme))
            .unwrap_or(&self.fallback)
    }

    /// 扫描目录下的 *.json 并以文件名注册为主题，返回成功数量
    pub async fn load_dir(&mut self, dir: &Path) -> std::io::Result<usize> {
        fs::create_dir_all(dir).await?;

        let mut loaded = 0;
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
            if !is_json || !entry.file_type().await?.is_file() {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let content = fs::read_to_string(&path).await?;
            match parse_theme(&content) {
                Ok(theme) => {
                    self.register(name, theme);
                    loaded += 1;
                    info!(target: "Chart", "Theme \"{}\" registered successfully!", name);
                }
                Err(e) => {
                    warn!(target: "Chart", "主题文件 {} 解析失败: {}", path.display(), e);
                }
            }
        }
        Ok(loaded)
    }
}

//! 声明式图表配置
//!
//! 这里的函数只负责把查询结果整理成 [`ChartOption`]，不涉及任何绘图。
//! 字段命名沿用前端图表库的习惯 (序列化为 camelCase)，方便导出 JSON 调试。

use crate::query::QueryResult;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// 排行榜使用的固定 20 色调色板 (按行号取模)
pub const RANK_COLORS: [&str; 20] = [
    "#5470C6", "#91CC75", "#FAC858", "#EE6666", "#73C0DE", "#3BA272", "#FC8452", "#9A60B4",
    "#EA7CCC", "#FFB761", "#5AB1EF", "#B6A2DE", "#8D98B3", "#C05050", "#5AB1EF", "#DD6B66",
    "#749F83", "#CBB0E3", "#C49B73", "#D3F2E6",
];

/// 坐标轴标签中的头像占位符
pub const AVATAR_PLACEHOLDER: &str = "{img|} ";

const RANK_BACKGROUND: &str = "#2c3e50";
const RANK_FOREGROUND: &str = "#ecf0f1";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChartOption {
    pub title: Title,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_style: Option<TextStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<Tooltip>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<Legend>,
    pub kind: ChartKind,
}

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Title {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tooltip {
    pub trigger: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatter: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Legend {
    pub data: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChartKind {
    Rank(RankChart),
    Bar(BarChart),
    Line(LineChart),
    Heatmap(HeatmapChart),
}

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AxisStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_color: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Grid {
    pub left: String,
    pub right: String,
    pub bottom: String,
    pub contain_label: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeriesLabel {
    pub show: bool,
    pub position: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BarSeries {
    pub name: String,
    pub data: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<SeriesLabel>,
    /// 每根柱子的颜色；为空时使用主题调色板
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub item_colors: Vec<String>,
}

// ================= 排行榜 =================

#[derive(Debug, Clone, PartialEq)]
pub struct RankRow {
    pub name: String,
    pub value: f64,
    pub avatar: Option<String>,
}

impl RankRow {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            avatar: None,
        }
    }

    pub fn with_avatar(mut self, url: impl Into<String>) -> Self {
        self.avatar = Some(url.into());
        self
    }

    /// 非空的头像地址
    fn avatar_url(&self) -> Option<&str> {
        self.avatar.as_deref().filter(|a| !a.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RankChart {
    pub grid: Grid,
    /// 数值轴两端留白比例
    pub boundary_gap: (f64, f64),
    pub value_axis: AxisStyle,
    pub category_axis: AxisStyle,
    /// 分类轴标签，带头像的行以 `{img|} ` 开头
    pub categories: Vec<String>,
    /// 与 categories 一一对应的头像地址 (占位符的图片来源)
    pub avatars: Vec<Option<String>>,
    pub avatar_height: u32,
    pub series: BarSeries,
}

impl RankChart {
    /// 去掉占位符后的纯文本标签
    pub fn label_text(&self, index: usize) -> &str {
        let raw = self.categories.get(index).map(String::as_str).unwrap_or("");
        raw.strip_prefix(AVATAR_PLACEHOLDER).unwrap_or(raw)
    }
}

/// 生成水平条形排行榜配置
///
/// 行顺序与输入一致；颜色取 `RANK_COLORS[index % 20]`；
/// 带头像的行在标签前插入图片占位符。
pub fn rank_option(name: &str, rows: &[RankRow]) -> ChartOption {
    let categories = rows
        .iter()
        .map(|row| match row.avatar_url() {
            Some(_) => format!("{}{}", AVATAR_PLACEHOLDER, row.name),
            None => row.name.clone(),
        })
        .collect();

    let axis_style = || AxisStyle {
        label_color: Some(RANK_FOREGROUND.to_string()),
        line_color: Some(RANK_FOREGROUND.to_string()),
    };

    ChartOption {
        title: Title {
            text: name.to_string(),
            color: Some(RANK_FOREGROUND.to_string()),
        },
        background_color: Some(RANK_BACKGROUND.to_string()),
        text_style: None,
        tooltip: Some(Tooltip {
            trigger: "axis".to_string(),
            formatter: None,
        }),
        legend: None,
        kind: ChartKind::Rank(RankChart {
            grid: Grid {
                left: "3%".to_string(),
                right: "4%".to_string(),
                bottom: "3%".to_string(),
                contain_label: true,
            },
            boundary_gap: (0.0, 0.01),
            value_axis: axis_style(),
            category_axis: axis_style(),
            categories,
            avatars: rows.iter().map(|row| row.avatar_url().map(String::from)).collect(),
            avatar_height: 20,
            series: BarSeries {
                name: "Count".to_string(),
                data: rows.iter().map(|row| row.value).collect(),
                label: Some(SeriesLabel {
                    show: true,
                    position: "right".to_string(),
                    color: Some(RANK_FOREGROUND.to_string()),
                }),
                item_colors: (0..rows.len())
                    .map(|i| RANK_COLORS[i % RANK_COLORS.len()].to_string())
                    .collect(),
            },
        }),
    }
}

// ================= 柱状图 (演示) =================

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BarChart {
    pub categories: Vec<String>,
    pub series: Vec<BarSeries>,
}

pub fn demo_option() -> ChartOption {
    let categories = ["衬衫", "羊毛衫", "雪纺衫", "裤子", "高跟鞋", "袜子"];
    ChartOption {
        title: Title {
            text: "ECharts 演示".to_string(),
            color: None,
        },
        background_color: None,
        text_style: None,
        tooltip: None,
        legend: Some(Legend {
            data: vec!["销量".to_string()],
        }),
        kind: ChartKind::Bar(BarChart {
            categories: categories.iter().map(|s| s.to_string()).collect(),
            series: vec![BarSeries {
                name: "销量".to_string(),
                data: vec![5.0, 20.0, 36.0, 10.0, 10.0, 20.0],
                label: None,
                item_colors: Vec::new(),
            }],
        }),
    }
}

// ================= 折线图 =================

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineSeries {
    pub name: String,
    /// (毫秒时间戳, 数值)
    pub data: Vec<(i64, f64)>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineChart {
    pub start_ms: i64,
    pub end_ms: i64,
    pub step_ms: i64,
    pub series: Vec<LineSeries>,
}

/// 由区间查询结果生成时间序列折线图
///
/// 每个序列对齐到 `start_ms + k * step` 的网格上，缺失点补 0。
pub fn line_option(
    result: &QueryResult,
    title: &str,
    start_ms: i64,
    end_ms: i64,
    step_secs: u64,
) -> ChartOption {
    let step_ms = (step_secs.max(1) * 1000) as i64;
    let grid: Vec<i64> = if end_ms >= start_ms {
        (0..=((end_ms - start_ms) / step_ms))
            .map(|k| start_ms + k * step_ms)
            .collect()
    } else {
        Vec::new()
    };

    let series: Vec<LineSeries> = result
        .result
        .iter()
        .enumerate()
        .map(|(idx, s)| {
            let mut data: Vec<(i64, f64)> = grid.iter().map(|&t| (t, 0.0)).collect();
            for (ts, raw) in s.samples() {
                let t = (ts * 1000.0).round() as i64;
                if t < start_ms || t > end_ms {
                    continue;
                }
                let slot = ((t - start_ms) as f64 / step_ms as f64).round() as usize;
                if let Some(point) = data.get_mut(slot) {
                    point.1 = parse_sample(raw);
                }
            }
            LineSeries {
                name: s.display_name(&format!("series {}", idx + 1)),
                data,
            }
        })
        .collect();

    ChartOption {
        title: Title {
            text: title.to_string(),
            color: None,
        },
        background_color: None,
        text_style: None,
        tooltip: Some(Tooltip {
            trigger: "axis".to_string(),
            formatter: None,
        }),
        legend: Some(Legend {
            data: series.iter().map(|s| s.name.clone()).collect(),
        }),
        kind: ChartKind::Line(LineChart {
            start_ms,
            end_ms,
            step_ms,
            series,
        }),
    }
}

// ================= 日历热力图 =================

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VisualMap {
    pub min: f64,
    pub max: f64,
    pub calculable: bool,
    pub orient: String,
    pub left: String,
    pub top: String,
    pub in_range: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Calendar {
    pub top: String,
    pub left: String,
    pub cell_size: (u32, u32),
    pub orient: String,
    pub show_year_label: bool,
    /// 每周第一天 (0 = 周日, 1 = 周一)
    pub first_day: u32,
    pub day_names: Vec<String>,
    pub show_month_label: bool,
    pub month_names: Vec<String>,
    /// 月份区间，如 `2024-05`
    pub range: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CellLabel {
    pub show: bool,
    pub color: String,
    pub symbol_size: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapChart {
    pub visual_map: VisualMap,
    pub calendar: Calendar,
    /// (yyyy-MM-dd, 数值)
    pub data: Vec<(String, f64)>,
    /// 叠加在格子上的散点标签层 (`日\n数值`)
    pub cell_label: CellLabel,
}

impl HeatmapChart {
    pub fn value_of(&self, date: &str) -> Option<f64> {
        self.data.iter().find(|(d, _)| d == date).map(|(_, v)| *v)
    }
}

/// 单元格标签文本：`日\n数值`
pub fn cell_label_text(date: &str, value: f64) -> String {
    let day = date
        .rsplit('-')
        .next()
        .and_then(|d| d.parse::<u32>().ok())
        .unwrap_or(0);
    format!("{}\n{}", day, format_number(value))
}

/// 把查询结果拍平成 `(yyyy-MM-dd, 数值)` 列表 (日期取 UTC)
pub fn format_heatmap_data(result: &QueryResult) -> Vec<(String, f64)> {
    result
        .result
        .iter()
        .flat_map(|series| series.samples())
        .filter_map(|(ts, raw)| {
            let date = DateTime::<Utc>::from_timestamp(*ts as i64, 0)?;
            Some((date.format("%Y-%m-%d").to_string(), parse_sample(raw)))
        })
        .collect()
}

/// 生成月度日历热力图配置，颜色刻度为 `[0, max(values)]`
pub fn heatmap_option(rows: Vec<(String, f64)>, label: &str) -> ChartOption {
    let max_value = rows
        .iter()
        .map(|(_, v)| *v)
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);

    let to_strings = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    ChartOption {
        title: Title::default(),
        background_color: Some("white".to_string()),
        text_style: None,
        tooltip: Some(Tooltip {
            trigger: "item".to_string(),
            formatter: Some("{date}: {value} messages".to_string()),
        }),
        legend: None,
        kind: ChartKind::Heatmap(HeatmapChart {
            visual_map: VisualMap {
                min: 0.0,
                max: max_value,
                calculable: true,
                orient: "horizontal".to_string(),
                left: "center".to_string(),
                top: "5%".to_string(),
                in_range: vec!["#e0ffff".to_string(), "#006edd".to_string()],
            },
            calendar: Calendar {
                top: "35%".to_string(),
                left: "center".to_string(),
                cell_size: (60, 50),
                orient: "vertical".to_string(),
                show_year_label: false,
                first_day: 1,
                day_names: to_strings(&["日", "一", "二", "三", "四", "五", "六"]),
                show_month_label: true,
                month_names: to_strings(&[
                    "一月", "二月", "三月", "四月", "五月", "六月", "七月", "八月", "九月",
                    "十月", "十一月", "十二月",
                ]),
                range: label.to_string(),
            },
            data: rows,
            cell_label: CellLabel {
                show: true,
                color: "#000".to_string(),
                symbol_size: 1,
            },
        }),
    }
}

fn parse_sample(raw: &str) -> f64 {
    raw.parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// 整数不带小数点，其余保留两位
pub fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{:.2}", v)
    }
}

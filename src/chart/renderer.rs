use super::font::PRESET_FAMILY;
use super::options::{
    BarChart, ChartKind, ChartOption, HeatmapChart, Legend, LineChart, RankChart, cell_label_text,
    format_number,
};
use super::theme::Theme;
use super::utils::{color_or, encode_rgb_png, lerp_color, overlay_on_rgb};
use chrono::{Datelike, Local, NaiveDate, TimeZone};
use image::RgbaImage;
use image::imageops::FilterType;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

const PADDING: i32 = 24;
const DEFAULT_FONT_SIZE: u32 = 18;

/// 一次绘制所需的画布参数
pub struct Canvas<'a> {
    pub width: u32,
    pub height: u32,
    pub theme: &'a Theme,
    /// 与排行榜各行一一对应的头像
    pub avatars: &'a [Option<RgbaImage>],
}

struct Fonts<'a> {
    family: &'a str,
    size: u32,
    color: RGBColor,
}

impl<'a> Fonts<'a> {
    fn style(&self, size: u32, color: RGBColor) -> TextStyle<'a> {
        (self.family, size).into_font().color(&color)
    }

    fn small(&self) -> u32 {
        (self.size * 4 / 5).max(6)
    }

    /// 字体不可用时按字号估算宽度
    fn measure(&self, text: &str, size: u32) -> (u32, u32) {
        (self.family, size)
            .into_font()
            .box_size(text)
            .unwrap_or_else(|_| (text.chars().count() as u32 * size * 3 / 5, size))
    }
}

/// 把图表配置绘制为 PNG
///
/// 文字绘制失败 (例如没有可用字体) 不会中断出图，只会缺少文字。
pub fn render_png(option: &ChartOption, canvas: &Canvas) -> Result<Vec<u8>, String> {
    let (width, height) = (canvas.width, canvas.height);
    if width == 0 || height == 0 {
        return Err(format!("图表尺寸无效: {}x{}", width, height));
    }

    let text_style = option.text_style.as_ref();
    let fonts = Fonts {
        family: text_style
            .and_then(|s| s.font_family.as_deref())
            .unwrap_or(PRESET_FAMILY),
        size: text_style
            .and_then(|s| s.font_size)
            .unwrap_or(DEFAULT_FONT_SIZE)
            .max(6),
        color: color_or(text_style.and_then(|s| s.color.as_deref()), canvas.theme.text),
    };
    let background = color_or(option.background_color.as_deref(), canvas.theme.background);

    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    let mut overlays = Vec::new();
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&background).map_err(|e| e.to_string())?;

        let top = draw_title(&root, option, &fonts, canvas.theme);
        match &option.kind {
            ChartKind::Rank(rank) => overlays = draw_rank(&root, rank, top, &fonts, canvas)?,
            ChartKind::Bar(bar) => {
                draw_bar(&root, bar, option.legend.as_ref(), top, &fonts, canvas.theme)?
            }
            ChartKind::Line(line) => draw_line(&root, line, top, &fonts, canvas.theme)?,
            ChartKind::Heatmap(heatmap) => draw_heatmap(&root, heatmap, top, &fonts, canvas)?,
        }

        root.present().map_err(|e| e.to_string())?;
    }

    for (img, x, y) in &overlays {
        overlay_on_rgb(&mut buffer, width, height, img, *x, *y);
    }

    encode_rgb_png(buffer, width, height)
}

/// 绘制左上角标题，返回标题下方的起始 y
fn draw_title(root: &Area, option: &ChartOption, fonts: &Fonts, theme: &Theme) -> i32 {
    if option.title.text.is_empty() {
        return PADDING;
    }
    let size = fonts.size * 4 / 3;
    let color = color_or(option.title.color.as_deref(), theme.title);
    let style = fonts.style(size, color).pos(Pos::new(HPos::Left, VPos::Top));
    let _ = root.draw_text(&option.title.text, &style, (PADDING, PADDING));
    PADDING + size as i32 + PADDING / 2
}

fn draw_legend(
    root: &Area,
    items: &[(String, RGBColor)],
    y: i32,
    fonts: &Fonts,
) -> Result<(), String> {
    const SWATCH: i32 = 25;
    const GAP: i32 = 12;

    let size = fonts.small();
    let widths: Vec<i32> = items
        .iter()
        .map(|(name, _)| fonts.measure(name, size).0 as i32)
        .collect();
    let total: i32 = widths.iter().map(|w| SWATCH + 5 + w + GAP).sum::<i32>() - GAP;
    let (canvas_w, _) = root.dim_in_pixel();
    let mut x = (canvas_w as i32 - total) / 2;

    let style = fonts
        .style(size, fonts.color)
        .pos(Pos::new(HPos::Left, VPos::Center));
    for ((name, color), w) in items.iter().zip(widths) {
        root.draw(&Rectangle::new([(x, y), (x + SWATCH, y + 14)], color.filled()))
            .map_err(|e| e.to_string())?;
        let _ = root.draw_text(name, &style, (x + SWATCH + 5, y + 7));
        x += SWATCH + 5 + w + GAP;
    }
    Ok(())
}

/// 解析 `center` / `N%` / 像素值形式的位置，返回元素起点
fn resolve_position(spec: &str, total: u32, size: i32) -> i32 {
    let spec = spec.trim();
    if spec == "center" {
        return (total as i32 - size) / 2;
    }
    if let Some(pct) = spec.strip_suffix('%') {
        return pct
            .trim()
            .parse::<f64>()
            .map(|p| (total as f64 * p / 100.0).round() as i32)
            .unwrap_or(0);
    }
    spec.trim_end_matches("px")
        .parse::<f64>()
        .map(|v| v.round() as i32)
        .unwrap_or(0)
}

fn max_finite(values: impl Iterator<Item = f64>) -> f64 {
    values.filter(|v| v.is_finite()).fold(0.0_f64, f64::max)
}

// ================= 排行榜 =================

type Overlay = (RgbaImage, i32, i32);

fn draw_rank(
    root: &Area,
    rank: &RankChart,
    top: i32,
    fonts: &Fonts,
    canvas: &Canvas,
) -> Result<Vec<Overlay>, String> {
    let n = rank.categories.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let size = fonts.size;
    let label_color = color_or(rank.category_axis.label_color.as_deref(), fonts.color);
    let axis_color = color_or(rank.category_axis.line_color.as_deref(), canvas.theme.axis_line);
    let tick_color = color_or(rank.value_axis.label_color.as_deref(), fonts.color);
    let grid_color = color_or(rank.value_axis.line_color.as_deref(), canvas.theme.split_line);
    let value_color = color_or(
        rank.series.label.as_ref().and_then(|l| l.color.as_deref()),
        tick_color,
    );
    let show_values = rank.series.label.as_ref().is_none_or(|l| l.show);

    let bottom = canvas.height as i32 - PADDING - fonts.small() as i32 - 8;
    let row_h = ((bottom - top) / n as i32).max(1);
    let bar_h = (row_h * 7 / 10).max(1);
    let avatar_px = (row_h * 4 / 5).min(rank.avatar_height as i32 * 2).max(1);
    let has_avatar = canvas.avatars.iter().any(Option::is_some);

    let text_widths: Vec<i32> = (0..n)
        .map(|i| fonts.measure(rank.label_text(i), size).0 as i32)
        .collect();
    let label_w = text_widths.iter().copied().max().unwrap_or(0)
        + if has_avatar { avatar_px + 8 } else { 0 };

    let value_labels: Vec<String> = rank.series.data.iter().map(|v| format_number(*v)).collect();
    let value_w = value_labels
        .iter()
        .map(|l| fonts.measure(l, size).0 as i32)
        .max()
        .unwrap_or(0)
        + 12;

    let x0 = PADDING + label_w + 8;
    let x1 = (canvas.width as i32 - PADDING - value_w).max(x0 + 1);
    let max_value = max_finite(rank.series.data.iter().copied());
    let axis_max = if max_value > 0.0 {
        max_value * (1.0 + rank.boundary_gap.1)
    } else {
        1.0
    };
    let scale = |v: f64| x0 + ((v.max(0.0) / axis_max) * (x1 - x0) as f64).round() as i32;

    // 数值轴刻度与分隔线
    let tick_style = fonts
        .style(fonts.small(), tick_color)
        .pos(Pos::new(HPos::Center, VPos::Top));
    for k in 0..=4 {
        let v = axis_max * k as f64 / 4.0;
        let x = scale(v);
        root.draw(&PathElement::new(
            vec![(x, top), (x, bottom)],
            grid_color.mix(0.25).stroke_width(1),
        ))
        .map_err(|e| e.to_string())?;
        let _ = root.draw_text(&format_number(v), &tick_style, (x, bottom + 4));
    }
    root.draw(&PathElement::new(vec![(x0, top), (x0, bottom)], axis_color.stroke_width(1)))
        .map_err(|e| e.to_string())?;

    let label_style = fonts
        .style(size, label_color)
        .pos(Pos::new(HPos::Right, VPos::Center));
    let value_style = fonts
        .style(size, value_color)
        .pos(Pos::new(HPos::Left, VPos::Center));

    let mut overlays = Vec::new();
    for i in 0..n {
        let cy = top + row_h * i as i32 + row_h / 2;
        let value = rank.series.data.get(i).copied().unwrap_or(0.0);
        let color = color_or(
            rank.series.item_colors.get(i).map(String::as_str),
            canvas.theme.pick(i),
        );
        let bar_end = scale(value).max(x0 + 1);

        root.draw(&Rectangle::new(
            [(x0 + 1, cy - bar_h / 2), (bar_end, cy + bar_h / 2)],
            color.filled(),
        ))
        .map_err(|e| e.to_string())?;

        let _ = root.draw_text(rank.label_text(i), &label_style, (x0 - 8, cy));
        if show_values && let Some(label) = value_labels.get(i) {
            let _ = root.draw_text(label, &value_style, (bar_end + 6, cy));
        }

        // 头像放在名字左侧
        if let Some(Some(img)) = canvas.avatars.get(i) {
            let resized =
                image::imageops::resize(img, avatar_px as u32, avatar_px as u32, FilterType::Triangle);
            let x = x0 - 8 - text_widths[i] - 6 - avatar_px;
            overlays.push((resized, x, cy - avatar_px / 2));
        }
    }

    Ok(overlays)
}

// ================= 柱状图 =================

fn draw_bar(
    root: &Area,
    bar: &BarChart,
    legend: Option<&Legend>,
    top: i32,
    fonts: &Fonts,
    theme: &Theme,
) -> Result<(), String> {
    let mut top = top;
    if let Some(legend) = legend
        && !legend.data.is_empty()
    {
        let items: Vec<(String, RGBColor)> = legend
            .data
            .iter()
            .map(|name| {
                let idx = bar.series.iter().position(|s| &s.name == name).unwrap_or(0);
                (name.clone(), theme.pick(idx))
            })
            .collect();
        draw_legend(root, &items, top, fonts)?;
        top += 30;
    }

    let n = bar.categories.len().max(1);
    let max_value = max_finite(bar.series.iter().flat_map(|s| s.data.iter().copied()));
    let y_max = if max_value > 0.0 { max_value * 1.1 } else { 1.0 };
    let small = fonts.small();

    let mut chart = ChartBuilder::on(root)
        .margin(PADDING)
        .margin_top(top)
        .x_label_area_size(small as i32 * 2)
        .y_label_area_size(small as i32 * 4)
        .build_cartesian_2d(0f64..n as f64, 0f64..y_max)
        .map_err(|e| e.to_string())?;

    let axis_text = fonts.style(small, fonts.color);
    if let Err(e) = chart
        .configure_mesh()
        .disable_x_mesh()
        .bold_line_style(theme.split_line.stroke_width(1))
        .light_line_style(theme.split_line.mix(0.3).stroke_width(1))
        .axis_style(theme.axis_line.stroke_width(1))
        .x_label_formatter(&|_| String::new())
        .y_label_formatter(&|v| format_number(*v))
        .y_label_style(axis_text.clone())
        .x_label_style(axis_text)
        .draw()
    {
        debug!(target: "Chart", "坐标轴文字绘制失败: {}", e);
    }

    let slot = 0.8 / bar.series.len().max(1) as f64;
    let value_style = fonts
        .style(small, fonts.color)
        .pos(Pos::new(HPos::Center, VPos::Bottom));
    for (si, series) in bar.series.iter().enumerate() {
        let base = theme.pick(si);
        let rects = series.data.iter().take(n).enumerate().map(|(ci, v)| {
            let color = color_or(series.item_colors.get(ci).map(String::as_str), base);
            let x = ci as f64 + 0.1 + slot * si as f64;
            Rectangle::new([(x, 0.0), (x + slot, v.max(0.0))], color.filled())
        });
        chart.draw_series(rects).map_err(|e| e.to_string())?;

        if series.label.as_ref().is_some_and(|l| l.show) {
            for (ci, v) in series.data.iter().take(n).enumerate() {
                let x = ci as f64 + 0.1 + slot * (si as f64 + 0.5);
                let (px, py) = chart.backend_coord(&(x, v.max(0.0)));
                let _ = root.draw_text(&format_number(*v), &value_style, (px, py - 4));
            }
        }
    }

    // 分类标签居中于每组柱子下方
    let category_style = fonts
        .style(small, fonts.color)
        .pos(Pos::new(HPos::Center, VPos::Top));
    for (ci, name) in bar.categories.iter().enumerate() {
        let (x, y) = chart.backend_coord(&(ci as f64 + 0.5, 0.0));
        let _ = root.draw_text(name, &category_style, (x, y + 6));
    }

    Ok(())
}

// ================= 折线图 =================

fn draw_line(
    root: &Area,
    line: &LineChart,
    top: i32,
    fonts: &Fonts,
    theme: &Theme,
) -> Result<(), String> {
    let max_value = max_finite(
        line.series
            .iter()
            .flat_map(|s| s.data.iter().map(|(_, v)| *v)),
    );
    let y_max = if max_value > 0.0 { max_value * 1.15 } else { 1.0 };
    let end_ms = line.end_ms.max(line.start_ms + 1);
    let small = fonts.small();

    let mut chart = ChartBuilder::on(root)
        .margin(PADDING)
        .margin_top(top)
        .x_label_area_size(small as i32 * 2)
        .y_label_area_size(small as i32 * 4)
        .build_cartesian_2d(line.start_ms..end_ms, 0f64..y_max)
        .map_err(|e| e.to_string())?;

    let time_label = |ms: &i64| {
        Local
            .timestamp_millis_opt(*ms)
            .single()
            .map(|t| t.format("%m-%d %H:%M").to_string())
            .unwrap_or_default()
    };
    let axis_text = fonts.style(small, fonts.color);
    if let Err(e) = chart
        .configure_mesh()
        .bold_line_style(theme.split_line.stroke_width(1))
        .light_line_style(theme.split_line.mix(0.3).stroke_width(1))
        .axis_style(theme.axis_line.stroke_width(1))
        .x_labels(8)
        .y_labels(6)
        .x_label_formatter(&time_label)
        .y_label_formatter(&|v| format_number(*v))
        .x_label_style(axis_text.clone())
        .y_label_style(axis_text)
        .draw()
    {
        debug!(target: "Chart", "坐标轴文字绘制失败: {}", e);
    }

    for (idx, series) in line.series.iter().enumerate() {
        let color = theme.pick(idx);
        chart
            .draw_series(LineSeries::new(
                series.data.iter().copied(),
                color.stroke_width(3),
            ))
            .map_err(|e| e.to_string())?
            .label(series.name.clone())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(3))
            });
    }

    if line.series.len() > 1
        && let Err(e) = chart
            .configure_series_labels()
            .background_style(theme.background)
            .border_style(theme.split_line)
            .position(SeriesLabelPosition::UpperRight)
            .label_font(fonts.style(small, fonts.color))
            .draw()
    {
        debug!(target: "Chart", "图例绘制失败: {}", e);
    }

    Ok(())
}

// ================= 日历热力图 =================

const EMPTY_CELL: RGBColor = RGBColor(0xf5, 0xf5, 0xf5);
const CELL_BORDER: RGBColor = RGBColor(0xcc, 0xcc, 0xcc);

fn draw_heatmap(
    root: &Area,
    heatmap: &HeatmapChart,
    top: i32,
    fonts: &Fonts,
    canvas: &Canvas,
) -> Result<(), String> {
    let calendar = &heatmap.calendar;
    let first = NaiveDate::parse_from_str(&format!("{}-01", calendar.range), "%Y-%m-%d")
        .map_err(|_| format!("无效的日历范围: {}", calendar.range))?;
    let days: Vec<NaiveDate> = first
        .iter_days()
        .take_while(|d| d.month() == first.month())
        .collect();

    let first_day = calendar.first_day % 7;
    let offset = (first.weekday().num_days_from_sunday() + 7 - first_day) % 7;
    let weeks = (days.len() as u32 + offset).div_ceil(7) as i32;
    let (cell_w, cell_h) = (calendar.cell_size.0 as i32, calendar.cell_size.1 as i32);
    let size = fonts.size;
    let small = fonts.small();

    // 1. 视觉映射条
    let vm = &heatmap.visual_map;
    let low = color_or(vm.in_range.first().map(String::as_str), EMPTY_CELL);
    let high = color_or(vm.in_range.last().map(String::as_str), low);
    let (bar_w, bar_h) = (200, 14);
    let vm_x = resolve_position(&vm.left, canvas.width, bar_w);
    let vm_y = resolve_position(&vm.top, canvas.height, bar_h).max(top);
    for i in 0..bar_w {
        let t = i as f64 / (bar_w - 1) as f64;
        root.draw(&Rectangle::new(
            [(vm_x + i, vm_y), (vm_x + i + 1, vm_y + bar_h)],
            lerp_color(low, high, t).filled(),
        ))
        .map_err(|e| e.to_string())?;
    }
    let min_style = fonts
        .style(small, fonts.color)
        .pos(Pos::new(HPos::Right, VPos::Center));
    let max_style = fonts
        .style(small, fonts.color)
        .pos(Pos::new(HPos::Left, VPos::Center));
    let _ = root.draw_text(&format_number(vm.min), &min_style, (vm_x - 8, vm_y + bar_h / 2));
    let _ = root.draw_text(&format_number(vm.max), &max_style, (vm_x + bar_w + 8, vm_y + bar_h / 2));

    // 2. 日历区块：月份 / 星期表头 / 格子
    let month_h = if calendar.show_month_label { size as i32 + 10 } else { 0 };
    let header_h = size as i32 + 10;
    let grid_w = cell_w * 7;
    let block_h = month_h + header_h + cell_h * weeks;
    let left = resolve_position(&calendar.left, canvas.width, grid_w);
    let block_top = resolve_position(&calendar.top, canvas.height, block_h)
        .max(vm_y + bar_h + size as i32 + 10);

    if calendar.show_month_label {
        let name = calendar
            .month_names
            .get(first.month0() as usize)
            .cloned()
            .unwrap_or_else(|| calendar.range.clone());
        let style = fonts
            .style(size, fonts.color)
            .pos(Pos::new(HPos::Center, VPos::Top));
        let _ = root.draw_text(&name, &style, (left + grid_w / 2, block_top));
    }

    let header_y = block_top + month_h;
    let header_style = fonts
        .style(small, fonts.color)
        .pos(Pos::new(HPos::Center, VPos::Center));
    for col in 0..7u32 {
        let Some(name) = calendar.day_names.get(((first_day + col) % 7) as usize) else {
            continue;
        };
        let x = left + col as i32 * cell_w + cell_w / 2;
        let _ = root.draw_text(name, &header_style, (x, header_y + header_h / 2));
    }

    let grid_top = header_y + header_h;
    let label_color = color_or(Some(heatmap.cell_label.color.as_str()), BLACK);
    let label_style = fonts
        .style(small, label_color)
        .pos(Pos::new(HPos::Center, VPos::Center));
    let line_h = small as i32 + 2;

    for day in &days {
        let date = day.format("%Y-%m-%d").to_string();
        let idx = day.day0() + offset;
        let x = left + (idx % 7) as i32 * cell_w;
        let y = grid_top + (idx / 7) as i32 * cell_h;

        let value = heatmap.value_of(&date);
        let fill = match value {
            Some(v) => {
                let t = if vm.max > vm.min {
                    (v - vm.min) / (vm.max - vm.min)
                } else {
                    0.0
                };
                lerp_color(low, high, t)
            }
            None => EMPTY_CELL,
        };
        root.draw(&Rectangle::new([(x, y), (x + cell_w, y + cell_h)], fill.filled()))
            .map_err(|e| e.to_string())?;
        root.draw(&Rectangle::new(
            [(x, y), (x + cell_w, y + cell_h)],
            CELL_BORDER.stroke_width(1),
        ))
        .map_err(|e| e.to_string())?;

        if heatmap.cell_label.show
            && let Some(v) = value
        {
            let label = cell_label_text(&date, v);
            let lines: Vec<&str> = label.lines().collect();
            let first_y = y + cell_h / 2 - line_h * (lines.len() as i32 - 1) / 2;
            for (k, text) in lines.iter().enumerate() {
                let _ = root.draw_text(
                    text,
                    &label_style,
                    (x + cell_w / 2, first_y + line_h * k as i32),
                );
            }
        }
    }

    Ok(())
}

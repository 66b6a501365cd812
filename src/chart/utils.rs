use image::{DynamicImage, ImageFormat, Rgba, RgbImage, RgbaImage};
use plotters::prelude::*;

/// 解析 `#RRGGBB` / `#RGB` / 常见颜色名
pub fn parse_color(s: &str) -> Option<RGBColor> {
    let s = s.trim();
    match s.to_ascii_lowercase().as_str() {
        "white" => return Some(RGBColor(255, 255, 255)),
        "black" => return Some(RGBColor(0, 0, 0)),
        "transparent" => return None,
        _ => {}
    }

    let hex = s.strip_prefix('#')?;
    let expand = |c: u8| c * 17;
    match hex.len() {
        6 => {
            let v = u32::from_str_radix(hex, 16).ok()?;
            Some(RGBColor((v >> 16) as u8, (v >> 8) as u8, v as u8))
        }
        3 => {
            let v = u16::from_str_radix(hex, 16).ok()?;
            Some(RGBColor(
                expand(((v >> 8) & 0xf) as u8),
                expand(((v >> 4) & 0xf) as u8),
                expand((v & 0xf) as u8),
            ))
        }
        _ => None,
    }
}

pub fn color_or(s: Option<&str>, fallback: RGBColor) -> RGBColor {
    s.and_then(parse_color).unwrap_or(fallback)
}

/// 线性插值两种颜色，t ∈ [0, 1]
pub fn lerp_color(from: RGBColor, to: RGBColor, t: f64) -> RGBColor {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    RGBColor(mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}

/// 将 plotters 的 RGB 缓冲区编码为 PNG
pub fn encode_rgb_png(buffer: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>, String> {
    let img = RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| "无法从原始像素数据构建图像".to_string())?;
    encode_png(DynamicImage::ImageRgb8(img))
}

pub fn encode_png(img: DynamicImage) -> Result<Vec<u8>, String> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    img.write_to(&mut cursor, ImageFormat::Png)
        .map_err(|e| format!("图片编码失败: {}", e))?;
    Ok(cursor.into_inner())
}

/// 将 RGBA 图像按 alpha 叠加到 RGB 缓冲区上
pub fn overlay_on_rgb(buffer: &mut [u8], width: u32, height: u32, overlay: &RgbaImage, x: i32, y: i32) {
    let (overlay_w, overlay_h) = overlay.dimensions();

    for oy in 0..overlay_h {
        for ox in 0..overlay_w {
            let bx = x + ox as i32;
            let by = y + oy as i32;
            if bx < 0 || by < 0 || bx >= width as i32 || by >= height as i32 {
                continue;
            }

            let fg = overlay.get_pixel(ox, oy);
            let alpha = fg[3] as f32 / 255.0;
            if alpha <= 0.0 {
                continue;
            }

            let idx = ((by as u32 * width + bx as u32) * 3) as usize;
            for c in 0..3 {
                let bg = buffer[idx + c] as f32;
                buffer[idx + c] = ((1.0 - alpha) * bg + alpha * fg[c] as f32) as u8;
            }
        }
    }
}

pub fn make_circular_avatar(img: &DynamicImage, size: u32) -> RgbaImage {
    let rgba = img.to_rgba8();
    let mut result = RgbaImage::new(size, size);
    let center = size as f32 / 2.0;
    let radius = center - 1.0;

    for y in 0..size.min(rgba.height()) {
        for x in 0..size.min(rgba.width()) {
            let alpha = circle_coverage(x, y, center, radius);
            if alpha > 0.0 {
                let mut pixel = *rgba.get_pixel(x, y);
                pixel[3] = (pixel[3] as f32 * alpha) as u8;
                result.put_pixel(x, y, pixel);
            }
        }
    }
    result
}

pub fn create_default_avatar(size: u32) -> RgbaImage {
    let mut result = RgbaImage::new(size, size);
    let center = size as f32 / 2.0;
    let radius = center - 1.0;

    for y in 0..size {
        for x in 0..size {
            let alpha = circle_coverage(x, y, center, radius);
            if alpha > 0.0 {
                result.put_pixel(x, y, Rgba([200, 200, 200, (255.0 * alpha) as u8]));
            }
        }
    }
    result
}

// 抗锯齿圆形遮罩：圆内 1，边缘 0~1
fn circle_coverage(x: u32, y: u32, center: f32, radius: f32) -> f32 {
    let dx = x as f32 - center + 0.5;
    let dy = y as f32 - center + 0.5;
    let dist = (dx * dx + dy * dy).sqrt();
    (radius + 0.5 - dist).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_names() {
        assert_eq!(parse_color("#5470C6"), Some(RGBColor(0x54, 0x70, 0xC6)));
        assert_eq!(parse_color("#000"), Some(RGBColor(0, 0, 0)));
        assert_eq!(parse_color("#fff"), Some(RGBColor(255, 255, 255)));
        assert_eq!(parse_color("white"), Some(RGBColor(255, 255, 255)));
        assert_eq!(parse_color("5470C6"), None);
        assert_eq!(parse_color("#zzzzzz"), None);
    }

    #[test]
    fn lerp_hits_endpoints() {
        let a = RGBColor(0xe0, 0xff, 0xff);
        let b = RGBColor(0x00, 0x6e, 0xdd);
        assert_eq!(lerp_color(a, b, 0.0), a);
        assert_eq!(lerp_color(a, b, 1.0), b);
        assert_eq!(lerp_color(a, b, 7.0), b);
        assert_eq!(lerp_color(a, b, f64::NAN), a);
    }

    #[test]
    fn overlay_respects_bounds_and_alpha() {
        let mut buf = vec![0u8; 4 * 4 * 3];
        let mut overlay = RgbaImage::new(3, 3);
        overlay.put_pixel(0, 0, Rgba([255, 255, 255, 255]));
        overlay.put_pixel(1, 0, Rgba([255, 255, 255, 0]));
        overlay_on_rgb(&mut buf, 4, 4, &overlay, 2, 0);
        assert_eq!(&buf[6..9], &[255, 255, 255]);
        assert_eq!(&buf[9..12], &[0, 0, 0]);

        // 越界位置不会 panic
        overlay_on_rgb(&mut buf, 4, 4, &overlay, -10, 10);
    }

    #[test]
    fn default_avatar_is_round() {
        let img = create_default_avatar(20);
        assert_eq!(img.get_pixel(0, 0)[3], 0);
        assert_eq!(img.get_pixel(10, 10)[3], 255);
    }
}

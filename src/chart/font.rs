use fontdb::{Database, Family, Query};
use plotters::style::{FontStyle, register_font};

/// 注册到绘图后端的字体族名称
pub const PRESET_FAMILY: &str = "ayjx-preset";

/// 未配置字体时依次尝试的系统字体 (优先中文字体)
const CANDIDATE_FAMILIES: [&str; 8] = [
    "Noto Sans CJK SC",
    "Noto Sans SC",
    "Source Han Sans SC",
    "Microsoft YaHei",
    "PingFang SC",
    "WenQuanYi Micro Hei",
    "Sarasa Gothic SC",
    "SimHei",
];

/// 解析并注册预设字体，返回字体来源描述；找不到任何字体时返回 None
pub fn init_preset_font(font_path: Option<&str>, font_family: Option<&str>) -> Option<String> {
    if let Some(path) = font_path.filter(|p| !p.is_empty()) {
        match std::fs::read(path) {
            Ok(bytes) => {
                if register_bytes(bytes) {
                    return Some(path.to_string());
                }
                warn!(target: "Chart", "字体文件无法解析: {}", path);
            }
            Err(e) => warn!(target: "Chart", "读取字体文件失败 {}: {}", path, e),
        }
    }

    let mut db = Database::new();
    db.load_system_fonts();
    debug!(target: "Chart", "系统字体数量: {}", db.len());

    let requested = font_family.filter(|f| !f.is_empty());
    let names = requested.into_iter().chain(CANDIDATE_FAMILIES);

    for name in names {
        if let Some(bytes) = query_face(&db, Family::Name(name))
            && register_bytes(bytes)
        {
            return Some(name.to_string());
        }
    }

    if let Some(name) = requested {
        warn!(target: "Chart", "未找到字体 {}，回退到系统默认字体", name);
    }

    let bytes = query_face(&db, Family::SansSerif)?;
    register_bytes(bytes).then(|| "sans-serif".to_string())
}

fn query_face(db: &Database, family: Family<'_>) -> Option<Vec<u8>> {
    let families = [family];
    let id = db.query(&Query {
        families: &families,
        ..Query::default()
    })?;
    db.with_face_data(id, |data, _index| data.to_vec())
}

fn register_bytes(bytes: Vec<u8>) -> bool {
    // 后端要求 'static 生命周期，字体只在启动时注册一次
    let data: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    register_font(PRESET_FAMILY, FontStyle::Normal, data).is_ok()
}

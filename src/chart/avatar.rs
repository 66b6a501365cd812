use super::utils::{create_default_avatar, encode_png, make_circular_avatar};
use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;

pub const AVATAR_SIZE: u32 = 100;
const CACHE_EXPIRE_DAYS: u64 = 3;
const DOWNLOAD_TIMEOUT_SECS: u64 = 8;

/// 批量加载图表引用的头像，顺序与输入一致；没有地址的位置返回 None，
/// 下载失败的位置返回灰色占位头像
pub async fn load_avatars(urls: &[Option<String>], cache_dir: Option<&Path>) -> Vec<Option<RgbaImage>> {
    if urls.iter().all(Option::is_none) {
        return vec![None; urls.len()];
    }

    if let Some(dir) = cache_dir
        && let Err(e) = fs::create_dir_all(dir).await
    {
        warn!(target: "Chart", "无法创建头像缓存目录 {}: {}", dir.display(), e);
    }

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .build()
    {
        Ok(c) => Some(c),
        Err(e) => {
            warn!(target: "Chart", "无法创建 HTTP 客户端: {}", e);
            None
        }
    };

    let default_avatar = create_default_avatar(AVATAR_SIZE);

    let futures: Vec<_> = urls
        .iter()
        .map(|url| {
            let client = client.clone();
            let file_path = match (cache_dir, url) {
                (Some(dir), Some(u)) => Some(cache_path(dir, u)),
                _ => None,
            };
            async move {
                let url = url.as_deref()?;
                Some(download_avatar_cached(client.as_ref(), url, file_path).await)
            }
        })
        .collect();

    futures_util::future::join_all(futures)
        .await
        .into_iter()
        .map(|slot| slot.map(|img| img.unwrap_or_else(|| default_avatar.clone())))
        .collect()
}

pub fn cache_path(dir: &Path, url: &str) -> PathBuf {
    dir.join(format!("{:x}_{}.png", md5::compute(url.as_bytes()), AVATAR_SIZE))
}

fn is_fresh(path: &Path) -> bool {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age <= Duration::from_secs(CACHE_EXPIRE_DAYS * 86400))
}

/// 下载头像并带文件缓存
async fn download_avatar_cached(
    client: Option<&reqwest::Client>,
    url: &str,
    file_path: Option<PathBuf>,
) -> Option<RgbaImage> {
    // 1. 尝试从缓存读取
    if let Some(path) = &file_path
        && path.exists()
        && is_fresh(path)
        && let Ok(img) = image::open(path)
    {
        return Some(img.to_rgba8());
    }

    // 2. 下载
    if let Some(client) = client
        && let Ok(resp) = client.get(url).send().await
        && resp.status().is_success()
        && let Ok(bytes) = resp.bytes().await
        && let Ok(img) = image::load_from_memory(&bytes)
    {
        let resized = img.resize_exact(AVATAR_SIZE, AVATAR_SIZE, FilterType::Lanczos3);
        let circular = make_circular_avatar(&resized, AVATAR_SIZE);

        // 3. 写入缓存
        if let Some(path) = &file_path
            && let Ok(data) = encode_png(DynamicImage::ImageRgba8(circular.clone()))
            && let Err(e) = fs::write(path, data).await
        {
            debug!(target: "Chart", "写入头像缓存失败 {}: {}", path.display(), e);
        }

        return Some(circular);
    }

    debug!(target: "Chart", "头像下载失败: {}", url);

    // 下载失败但有旧缓存，勉强使用旧缓存
    if let Some(path) = &file_path
        && path.exists()
        && let Ok(img) = image::open(path)
    {
        return Some(img.to_rgba8());
    }

    None
}

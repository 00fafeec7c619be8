//! 宿主适配层
//!
//! 编辑器只认识图片文件名；这里负责把名字解析成可加载的资源：
//! 逻辑地址是宿主的 URL 方案 `/view?filename=<名字>&type=input&subfolder=`，
//! 实际字节从本地 input 目录读取。解码在工作线程上进行，
//! 结果经 crossbeam 通道送回 UI 线程。图片加载是唯一的异步边界。

use crossbeam::channel::{unbounded, Receiver, Sender};
use std::path::PathBuf;
use std::thread;

/// 支持的图片扩展名
const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// 解码完成的图片
pub struct LoadedImage {
    pub name: String,
    pub natural: (u32, u32),
    pub pixels: egui::ColorImage,
}

/// 加载结果（跨线程传回）
pub enum LoadResult {
    Ok(LoadedImage),
    Err { name: String, message: String },
}

/// 宿主适配器
pub struct HostAdapter {
    input_dir: PathBuf,
    tx: Sender<LoadResult>,
    rx: Receiver<LoadResult>,
}

impl HostAdapter {
    pub fn new(input_dir: PathBuf) -> Self {
        let (tx, rx) = unbounded();
        Self { input_dir, tx, rx }
    }

    /// 图片的逻辑地址（宿主 URL 方案，编辑器按不透明字符串对待）
    pub fn view_url(name: &str) -> String {
        format!(
            "/view?filename={}&type=input&subfolder=",
            percent_encode(name)
        )
    }

    /// input 目录里可选择的图片文件名（排序后）
    pub fn list_input_images(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.input_dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect();
        names.sort();
        names
    }

    /// 请求后台加载一张图片
    pub fn request_load(&self, name: &str) {
        let path = self.input_dir.join(name);
        let name = name.to_string();
        let tx = self.tx.clone();

        tracing::info!("Loading image {} ({})", Self::view_url(&name), path.display());

        thread::spawn(move || {
            let result = match std::fs::read(&path) {
                Ok(bytes) => decode_image(&name, &bytes),
                Err(e) => Err(e.to_string()),
            };
            let message = match result {
                Ok(loaded) => LoadResult::Ok(loaded),
                Err(message) => LoadResult::Err { name, message },
            };
            // 接收端已关闭时丢弃结果即可
            let _ = tx.send(message);
        });
    }

    /// UI 线程每帧轮询加载结果
    pub fn poll(&self) -> Option<LoadResult> {
        self.rx.try_recv().ok()
    }
}

/// 解码为 egui 纹理像素
fn decode_image(name: &str, bytes: &[u8]) -> Result<LoadedImage, String> {
    let decoded = image::load_from_memory(bytes).map_err(|e| e.to_string())?;
    let rgba = decoded.to_rgba8();
    let natural = (rgba.width(), rgba.height());
    let pixels = egui::ColorImage::from_rgba_unmultiplied(
        [natural.0 as usize, natural.1 as usize],
        rgba.as_flat_samples().as_slice(),
    );
    Ok(LoadedImage {
        name: name.to_string(),
        natural,
        pixels,
    })
}

/// 最小化的查询参数编码（与原宿主的 encodeURIComponent 对齐）
fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

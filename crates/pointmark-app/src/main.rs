//! PointMark 主应用程序入口
//!
//! 扮演宿主的角色：构建编辑器组件，按生命周期钩子驱动它
//! （创建/恢复/序列化），解析图片资源并处理工作流文件的
//! 打开与保存。组件自身的交互逻辑都在 pointmark-ui 里。

mod host;

use anyhow::Result;
use eframe::egui;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use host::{HostAdapter, LoadResult};
use pointmark_file::{load as load_workflow, save as save_workflow};
use pointmark_ui::editor::FOOTPRINT;
use pointmark_ui::PointMarkEditor;

/// 文件操作类型
#[derive(Debug, Clone)]
enum FileOperation {
    Open(PathBuf),
    Save(PathBuf),
}

/// PointMark 应用程序
struct PointMarkApp {
    editor: PointMarkEditor,
    host: HostAdapter,

    /// 当前工作流文件路径（快速保存用）
    workflow_path: Option<PathBuf>,

    /// 待处理的文件操作（由菜单/快捷键生成）
    pending_file_op: Option<FileOperation>,
}

impl PointMarkApp {
    fn new(input_dir: PathBuf) -> Self {
        Self {
            editor: PointMarkEditor::new(),
            host: HostAdapter::new(input_dir),
            workflow_path: None,
            pending_file_op: None,
        }
    }

    /// 打开文件对话框 - 打开工作流
    fn show_open_dialog(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Workflow Files", &["json"])
            .set_title("打开工作流")
            .pick_file()
        {
            self.pending_file_op = Some(FileOperation::Open(path));
        }
    }

    /// 打开文件对话框 - 保存工作流
    fn show_save_dialog(&mut self) {
        let mut dialog = rfd::FileDialog::new()
            .add_filter("Workflow Files", &["json"])
            .set_title("保存工作流");

        if let Some(path) = &self.workflow_path {
            if let Some(file_name) = path.file_name() {
                dialog = dialog.set_file_name(file_name.to_string_lossy().as_ref());
            }
        }

        if let Some(path) = dialog.save_file() {
            self.pending_file_op = Some(FileOperation::Save(path));
        }
    }

    /// 快速保存（已有路径时不弹对话框）
    fn quick_save(&mut self) {
        match &self.workflow_path {
            Some(path) => self.pending_file_op = Some(FileOperation::Save(path.clone())),
            None => self.show_save_dialog(),
        }
    }

    /// 处理文件操作
    fn process_file_operations(&mut self) {
        if let Some(op) = self.pending_file_op.take() {
            match op {
                FileOperation::Open(path) => match load_workflow(&path) {
                    Ok(state) => {
                        self.editor.on_configure(state);
                        self.workflow_path = Some(path.clone());
                        info!("Opened workflow: {}", path.display());
                    }
                    Err(e) => {
                        self.editor.state.status_message = format!("打开失败: {}", e);
                        tracing::error!("Failed to open workflow: {}", e);
                    }
                },
                FileOperation::Save(path) => {
                    let state = self.editor.on_serialize();
                    match save_workflow(&state, &path) {
                        Ok(()) => {
                            self.workflow_path = Some(path.clone());
                            self.editor.state.status_message =
                                format!("已保存: {}", path.display());
                            info!("Saved workflow: {}", path.display());
                        }
                        Err(e) => {
                            self.editor.state.status_message = format!("保存失败: {}", e);
                            tracing::error!("Failed to save workflow: {}", e);
                        }
                    }
                }
            }
        }
    }

    /// 轮询图片加载：编辑器的请求交给适配器，结果转成纹理交还编辑器
    fn process_image_loading(&mut self, ctx: &egui::Context) {
        if let Some(name) = self.editor.take_image_request() {
            self.host.request_load(&name);
        }

        if let Some(result) = self.host.poll() {
            match result {
                LoadResult::Ok(loaded) => {
                    let texture = ctx.load_texture(
                        format!("input:{}", loaded.name),
                        loaded.pixels,
                        egui::TextureOptions::LINEAR,
                    );
                    self.editor.image_loaded(texture, loaded.natural);
                }
                LoadResult::Err { name, message } => {
                    tracing::warn!("Image {} failed: {}", name, message);
                    self.editor.image_failed(&message);
                }
            }
        }
    }
}

impl eframe::App for PointMarkApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_file_operations();
        self.process_image_loading(ctx);

        ctx.set_visuals(egui::Visuals::dark());

        // 快捷键：输入框持有焦点时由它消费全部键盘事件，这里不会触发
        if !self.editor.state.field_focused {
            ctx.input(|i| {
                if i.modifiers.command && i.key_pressed(egui::Key::O) {
                    self.show_open_dialog();
                }
                if i.modifiers.command && i.key_pressed(egui::Key::S) {
                    if i.modifiers.shift {
                        self.show_save_dialog();
                    } else {
                        self.quick_save();
                    }
                }
                if i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace) {
                    self.editor.delete_selected();
                }
                if i.key_pressed(egui::Key::Escape) {
                    self.editor.state.clear_selection();
                }
            });
        }

        // ===== 顶部菜单 =====
        #[allow(deprecated)]
        egui::TopBottomPanel::top("menu").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("文件", |ui| {
                    if ui.button("📄 新建").clicked() {
                        self.editor = PointMarkEditor::new();
                        self.workflow_path = None;
                        ui.close();
                    }
                    ui.separator();
                    if ui.button("📂 打开工作流 (Ctrl+O)").clicked() {
                        self.show_open_dialog();
                        ui.close();
                    }
                    if ui.button("💾 保存工作流 (Ctrl+S)").clicked() {
                        self.quick_save();
                        ui.close();
                    }
                    if ui.button("💾 另存为 (Ctrl+Shift+S)").clicked() {
                        self.show_save_dialog();
                        ui.close();
                    }
                    ui.separator();
                    if ui.button("🚪 退出").clicked() {
                        std::process::exit(0);
                    }
                });

                ui.separator();
                ui.label("图片:");
                let selected = if self.editor.image_name().is_empty() {
                    "选择图片".to_string()
                } else {
                    self.editor.image_name().to_string()
                };
                let mut chosen: Option<String> = None;
                egui::ComboBox::from_id_salt("image_select")
                    .selected_text(selected)
                    .show_ui(ui, |ui| {
                        for name in self.host.list_input_images() {
                            if ui
                                .selectable_label(self.editor.image_name() == name, &name)
                                .clicked()
                            {
                                chosen = Some(name);
                            }
                        }
                    });
                if let Some(name) = chosen {
                    self.editor.set_image(&name);
                }
            });
        });

        // ===== 状态栏 =====
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.editor.state.status_message);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if let Some(selected) = self.editor.state.selected {
                        ui.label(format!("选中: {}", selected + 1));
                        ui.separator();
                    }
                    ui.label(format!("标记: {}", self.editor.store().len()));
                    ui.separator();
                    let image = if self.editor.image_name().is_empty() {
                        "无图片"
                    } else {
                        self.editor.image_name()
                    };
                    ui.label(image);
                });
            });
        });

        // ===== 右侧面板 - 输出通道 =====
        egui::SidePanel::right("outputs").default_width(240.0).show(ctx, |ui| {
            ui.heading("输出");
            ui.separator();
            ui.label("标记点 (JSON):");
            let mut points_json = self.editor.points_json();
            ui.add(
                egui::TextEdit::multiline(&mut points_json)
                    .font(egui::TextStyle::Monospace)
                    .desired_rows(6),
            );
            ui.separator();
            ui.label("指令文本:");
            let mut instruction = self.editor.instruction_text();
            ui.add(egui::TextEdit::multiline(&mut instruction).desired_rows(6));
        });

        // ===== 中央编辑器 =====
        egui::CentralPanel::default().show(ctx, |ui| {
            // 组件固定脚印，忽略外壳的尺寸变化
            ui.set_max_width(FOOTPRINT.x);
            self.editor.ui(ui);
        });

        // 拖动与光标需要持续重绘
        ctx.request_repaint();
    }
}

/// 设置中文字体支持
fn setup_chinese_fonts(ctx: &egui::Context) {
    let mut fonts = egui::FontDefinitions::default();

    let font_paths = [
        // macOS
        "/System/Library/Fonts/PingFang.ttc",
        "/System/Library/Fonts/STHeiti Light.ttc",
        "/System/Library/Fonts/Hiragino Sans GB.ttc",
        // Linux
        "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
        "/usr/share/fonts/truetype/droid/DroidSansFallbackFull.ttf",
        // Windows
        "C:\\Windows\\Fonts\\msyh.ttc",
        "C:\\Windows\\Fonts\\simsun.ttc",
    ];

    for path in font_paths {
        if let Ok(font_data) = std::fs::read(path) {
            fonts.font_data.insert(
                "chinese".to_owned(),
                std::sync::Arc::new(egui::FontData::from_owned(font_data)),
            );

            fonts
                .families
                .entry(egui::FontFamily::Proportional)
                .or_default()
                .insert(0, "chinese".to_owned());
            fonts
                .families
                .entry(egui::FontFamily::Monospace)
                .or_default()
                .insert(0, "chinese".to_owned());

            info!("Loaded Chinese font from: {}", path);
            break;
        }
    }

    ctx.set_fonts(fonts);
}

fn main() -> Result<()> {
    tracing::subscriber::set_global_default(
        FmtSubscriber::builder().with_max_level(Level::INFO).finish(),
    )?;

    // 第一个参数可指定图片目录，默认 ./input
    let input_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("input"));

    info!("Starting PointMark, input dir: {}", input_dir.display());

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([720.0, 640.0])
            .with_resizable(false)
            .with_title("PointMark"),
        ..Default::default()
    };

    eframe::run_native(
        "PointMark",
        native_options,
        Box::new(move |cc| {
            setup_chinese_fonts(&cc.egui_ctx);
            Ok(Box::new(PointMarkApp::new(input_dir)))
        }),
    )
    .map_err(|e| anyhow::anyhow!("eframe error: {}", e))?;

    Ok(())
}

use std::fmt::Write as _;
use std::path::Path;

use casa_config::AppConfig;
use casa_core::geometry::Point2;
use casa_core::model::Project;
use casa_engine::command::{CommandBus, CommandContext, CommandRequest};
use casa_engine::editor::Editor;
use casa_io::{JsonFacade, ProjectSaver};
use tracing::{info, warn};

use crate::errors::FrontendError;
use crate::loader::{ProjectSource, load_editor};

/// 简易 CLI 演示：打开项目（或绘制内置示例），演示撤销/重做命令并打印平面概览。
pub fn run_demo(
    config: &AppConfig,
    open: Option<&Path>,
    save: Option<&Path>,
) -> Result<(), FrontendError> {
    let loaded = load_editor(config, open)?;
    let mut editor = loaded.editor;
    let command_bus = CommandBus::new();
    let mut context = CommandContext {
        editor: &mut editor,
    };

    let mut commands: Vec<&str> = command_bus.available_commands().copied().collect();
    commands.sort_unstable();
    println!("支持的命令: {}", commands.join(", "));

    println!("CasaPro 平面图 CLI 演示");
    match &loaded.source {
        ProjectSource::File(path) => {
            println!("已从 JSON 加载项目：{}", path.display());
            for issue in &loaded.report.repaired {
                println!("  - 已修复: {issue}");
            }
        }
        ProjectSource::Demo => {
            if let Some(ids) = &loaded.demo_entities {
                println!("已用绘图工具构建内置示例：");
                let walls: Vec<String> = ids.walls.iter().map(ToString::to_string).collect();
                println!("  - 墙体 = {}", walls.join(", "));
                println!("  - 房间 = {}", ids.room);
                println!("  - 门 = {}, 窗 = {}", ids.door, ids.window);
                println!("  - 家具 = {}", ids.sofa);
            }
        }
    }

    if context.editor.can_undo() {
        for name in ["undo", "redo"] {
            if let Err(err) = dispatch_cli_command(&command_bus, name, &[], &mut context) {
                warn!("CLI 命令执行失败: {err}");
            }
        }
    }
    for (name, arg) in [("set_view", "2d"), ("set_tool", "select")] {
        if let Err(err) = dispatch_cli_command(&command_bus, name, &[arg], &mut context) {
            warn!("CLI 命令执行失败: {err}");
        }
    }

    print!("{}", render_overview(context.editor));

    if let Some(path) = save.or(config.storage.save_path.as_deref()) {
        let project = editor.serialize_project()?;
        JsonFacade::new().save(&project, path)?;
        info!(path = %path.display(), "项目已保存");
        println!("项目已保存到 {}", path.display());
    }
    Ok(())
}

/// 生成当前项目的文字概览；未打开项目时给出提示。
pub fn render_overview(editor: &Editor) -> String {
    let mut out = String::new();
    let Some(project) = editor.project() else {
        out.push_str("当前没有打开的项目。\n");
        return out;
    };
    let unit = project.settings.unit;

    let _ = writeln!(out, "项目「{}」 ({})", project.name, project.id);
    let _ = writeln!(
        out,
        "单位={}, 网格={}, 实体数={}, 房间总面积={}",
        unit.suffix(),
        unit.format_length(project.settings.grid_size),
        project.entity_count(),
        unit.format_area(project.total_room_area())
    );
    if let Some(bounds) = project.bounds() {
        let _ = writeln!(
            out,
            "范围 {} -> {} ({} × {})",
            format_point(bounds.min()),
            format_point(bounds.max()),
            unit.format_length(bounds.width()),
            unit.format_length(bounds.height())
        );
    }

    let _ = writeln!(out, "墙体：");
    for wall in project.walls.values() {
        let _ = writeln!(
            out,
            "  - {} {} -> {}, 长={}, 高={}, 厚={}, 门={}, 窗={}",
            wall.id,
            format_point(wall.start),
            format_point(wall.end),
            unit.format_length(wall.length()),
            unit.format_length(wall.height),
            unit.format_length(wall.thickness),
            project.doors_on(&wall.id).count(),
            project.windows_on(&wall.id).count()
        );
    }

    let _ = writeln!(out, "房间：");
    for room in project.rooms.values() {
        let _ = writeln!(
            out,
            "  - {} 「{}」 类型={}, 顶点={}, 面积={}, 周长={}",
            room.id,
            room.name,
            room.room_type.label(),
            room.points().len(),
            unit.format_area(room.area()),
            unit.format_length(room.perimeter())
        );
    }

    write_openings(&mut out, project);

    let _ = writeln!(out, "家具：");
    for item in project.furniture.values() {
        let _ = writeln!(
            out,
            "  - {} {} 位置={}, 旋转={:.1}°",
            item.id,
            item.name,
            format_point(item.plan_position()),
            item.rotation.to_degrees()
        );
    }

    let history = editor.history();
    let _ = writeln!(
        out,
        "历史：{}/{} 条 (可撤销={}, 可重做={})，工具={}, 视图={}",
        history.index(),
        history.len(),
        editor.can_undo(),
        editor.can_redo(),
        editor.tool_mode(),
        editor.view_mode()
    );
    out
}

fn write_openings(out: &mut String, project: &Project) {
    let _ = writeln!(out, "门窗：");
    for door in project.doors.values() {
        let _ = writeln!(
            out,
            "  - 门 {} @ {} 位置={:.2}, 宽={}",
            door.id,
            door.wall_id,
            door.position,
            project.settings.unit.format_length(door.width)
        );
    }
    for window in project.windows.values() {
        let _ = writeln!(
            out,
            "  - 窗 {} @ {} 位置={:.2}, 宽={}, 窗台={}",
            window.id,
            window.wall_id,
            window.position,
            project.settings.unit.format_length(window.width),
            project.settings.unit.format_length(window.sill_height)
        );
    }
}

fn format_point(point: Point2) -> String {
    format!("({:.2}, {:.2})", point.x(), point.y())
}

fn dispatch_cli_command(
    bus: &CommandBus,
    name: &str,
    args: &[&str],
    context: &mut CommandContext<'_>,
) -> Result<(), String> {
    let request = CommandRequest {
        name: name.to_string(),
        args: args.iter().map(|arg| arg.to_string()).collect(),
    };
    let response = bus.dispatch(&request, context);
    if response.success {
        if let Some(message) = response.message {
            println!("[命令] {message}");
        }
        Ok(())
    } else {
        Err(response.message.unwrap_or_else(|| "未知错误".to_string()))
    }
}

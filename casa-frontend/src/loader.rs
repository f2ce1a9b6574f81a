use std::path::{Path, PathBuf};

use casa_config::AppConfig;
use casa_core::geometry::Point2;
use casa_core::model::{EntityId, NewProjectOptions, ProjectSettings, RoomType, Unit};
use casa_engine::editor::Editor;
use casa_engine::store::LoadReport;
use casa_engine::tools::{InputEvent, ToolDefaults, ToolMode, ToolOutcome};
use casa_io::{JsonFacade, ProjectLoader};
use tracing::{debug, info, warn};

use crate::errors::FrontendError;

/// 项目来源，便于前端呈现加载信息。
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectSource {
    File(PathBuf),
    Demo,
}

/// 演示项目中的关键实体。
#[derive(Debug, Clone)]
pub struct DemoEntities {
    pub walls: Vec<EntityId>,
    pub room: EntityId,
    pub door: EntityId,
    pub window: EntityId,
    pub sofa: EntityId,
}

/// 统一封装加载后的编辑器与元信息。
#[derive(Debug)]
pub struct LoadedEditor {
    pub editor: Editor,
    pub source: ProjectSource,
    pub report: LoadReport,
    pub demo_entities: Option<DemoEntities>,
}

/// 按配置创建空编辑器（撤销深度、命中容差）。
pub fn editor_from_config(config: &AppConfig) -> Editor {
    let mut editor = Editor::with_history_depth(config.editor.history_depth);
    editor.set_tool_defaults(ToolDefaults {
        hit_tolerance: config.editor.hit_tolerance,
        close_tolerance: config.editor.close_tolerance,
        ..ToolDefaults::default()
    });
    editor
}

/// 新建项目的参数与设置，取自 `[editor.settings]`。
pub fn project_defaults(
    config: &AppConfig,
) -> Result<(NewProjectOptions, ProjectSettings), FrontendError> {
    let defaults = &config.editor.settings;
    let unit: Unit = defaults
        .unit
        .parse()
        .map_err(|err| FrontendError::InvalidConfig(format!("{err}")))?;
    let options = NewProjectOptions {
        unit,
        wall_height: defaults.wall_height,
        wall_thickness: defaults.wall_thickness,
        ..NewProjectOptions::default()
    };
    let settings = ProjectSettings {
        unit,
        grid_size: defaults.grid_size,
        snap_to_grid: defaults.snap_to_grid,
        snap_to_angle: defaults.snap_to_angle,
        snap_angles: defaults.snap_angles.clone(),
        default_wall_height: defaults.wall_height,
        default_wall_thickness: defaults.wall_thickness,
        ..ProjectSettings::default()
    };
    Ok((options, settings))
}

/// 打开 `open` 或 `[storage] project_path` 指定的项目 JSON，失败时回退到内置演示项目。
pub fn load_editor(config: &AppConfig, open: Option<&Path>) -> Result<LoadedEditor, FrontendError> {
    let mut editor = editor_from_config(config);

    let path = open
        .map(Path::to_path_buf)
        .or_else(|| config.storage.project_path.clone());
    if let Some(path) = path {
        let loaded = JsonFacade::new()
            .load(&path)
            .map_err(FrontendError::from)
            .and_then(|project| editor.load_project(project).map_err(FrontendError::from));
        match loaded {
            Ok(report) => {
                for issue in &report.repaired {
                    warn!(path = %path.display(), issue = %issue, "载入时已修复");
                }
                info!(path = %path.display(), "从 JSON 加载项目成功");
                return Ok(LoadedEditor {
                    editor,
                    source: ProjectSource::File(path),
                    report,
                    demo_entities: None,
                });
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "加载项目失败，回退到内置示例");
            }
        }
    }

    let (options, settings) = project_defaults(config)?;
    editor.create_project(options);
    editor.update_settings(settings)?;
    let demo_entities = populate_demo(&mut editor)?;

    Ok(LoadedEditor {
        editor,
        source: ProjectSource::Demo,
        report: LoadReport::default(),
        demo_entities: Some(demo_entities),
    })
}

fn expect_commit(outcome: ToolOutcome) -> Result<EntityId, FrontendError> {
    match outcome {
        ToolOutcome::Committed(id) => Ok(id),
        ToolOutcome::Rejected(err) => Err(err.into()),
        other => Err(FrontendError::UnexpectedOutcome(format!("{other:?}"))),
    }
}

/// 通过工具状态机绘制一个 6 m × 4 m 的单间，并放置门、窗与沙发。
pub fn populate_demo(editor: &mut Editor) -> Result<DemoEntities, FrontendError> {
    let corners = [
        Point2::new(0.0, 0.0),
        Point2::new(6.0, 0.0),
        Point2::new(6.0, 4.0),
        Point2::new(0.0, 4.0),
    ];

    editor.set_tool_mode(ToolMode::Wall);
    let mut walls = Vec::with_capacity(corners.len());
    for (index, start) in corners.iter().enumerate() {
        let end = corners[(index + 1) % corners.len()];
        editor.handle_input(InputEvent::PointerDown(*start));
        walls.push(expect_commit(editor.handle_input(InputEvent::PointerUp(end)))?);
    }

    let mut defaults = editor.tools().defaults().clone();
    defaults.room_type = RoomType::Living;
    editor.set_tool_defaults(defaults);
    editor.set_tool_mode(ToolMode::Room);
    for corner in corners {
        editor.handle_input(InputEvent::PointerDown(corner));
    }
    let room = expect_commit(editor.handle_input(InputEvent::Close))?;

    editor.set_tool_mode(ToolMode::Door);
    let door = expect_commit(editor.handle_input(InputEvent::PointerDown(Point2::new(2.4, 0.1))))?;

    editor.set_tool_mode(ToolMode::Window);
    let window =
        expect_commit(editor.handle_input(InputEvent::PointerDown(Point2::new(6.05, 2.0))))?;

    editor.set_tool_mode(ToolMode::Furniture);
    let sofa = expect_commit(editor.handle_input(InputEvent::PointerDown(Point2::new(3.0, 2.0))))?;

    editor.set_tool_mode(ToolMode::Select);
    debug!(
        walls = walls.len(),
        room = %room,
        door = %door,
        window = %window,
        sofa = %sofa,
        "已创建演示实体"
    );

    Ok(DemoEntities {
        walls,
        room,
        door,
        window,
        sofa,
    })
}

use std::fmt;
use std::str::FromStr;

use casa_core::geometry::{self, Point2, Vector2};
use casa_core::model::{
    DoorProps, EntityId, FurnitureSpec, OpeningKind, OpeningSpec, ParseEnumError, RoomType,
    WallProps, WindowProps,
};
use tracing::debug;

use crate::editor::Editor;
use crate::errors::ModelError;
use crate::store::Selection;

pub const DEFAULT_HIT_TOLERANCE: f64 = 0.25;
pub const DEFAULT_CLOSE_TOLERANCE: f64 = 0.3;

/// 当前激活的编辑工具，任一时刻只有一个。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ToolMode {
    #[default]
    Select,
    Wall,
    Room,
    Door,
    Window,
    Furniture,
    Measure,
    Eraser,
}

impl ToolMode {
    pub const ALL: [ToolMode; 8] = [
        ToolMode::Select,
        ToolMode::Wall,
        ToolMode::Room,
        ToolMode::Door,
        ToolMode::Window,
        ToolMode::Furniture,
        ToolMode::Measure,
        ToolMode::Eraser,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolMode::Select => "select",
            ToolMode::Wall => "wall",
            ToolMode::Room => "room",
            ToolMode::Door => "door",
            ToolMode::Window => "window",
            ToolMode::Furniture => "furniture",
            ToolMode::Measure => "measure",
            ToolMode::Eraser => "eraser",
        }
    }
}

impl fmt::Display for ToolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ToolMode {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        ToolMode::ALL
            .into_iter()
            .find(|mode| mode.name() == normalized)
            .ok_or_else(|| ParseEnumError {
                kind: "工具",
                value: value.to_string(),
            })
    }
}

/// 视图层转发的指针与键盘事件，坐标均为平面世界坐标。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown(Point2),
    PointerMove(Point2),
    PointerUp(Point2),
    /// 显式结束当前草图（如双击或回车）。
    Close,
    /// Escape。
    Cancel,
}

/// 草图的只读几何，供视图绘制橡皮筋预览。
#[derive(Debug, Clone, PartialEq)]
pub enum DraftPreview {
    Segment {
        start: Point2,
        end: Point2,
    },
    Polygon {
        points: Vec<Point2>,
        cursor: Point2,
    },
    Opening {
        kind: OpeningKind,
        wall_id: EntityId,
        position: f64,
    },
    Drag {
        target: Selection,
        delta: Vector2,
    },
    Measure {
        start: Point2,
        end: Point2,
        distance: f64,
    },
}

/// 一次输入事件的处理结果。
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Ignored,
    Draft,
    Committed(EntityId),
    Selected(Option<Selection>),
    Moved(Selection),
    Erased(Selection),
    Measured(f64),
    Rejected(ModelError),
    Cancelled,
}

/// 工具使用的默认参数：命中容差与新建门窗、家具、房间的模板。
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefaults {
    pub hit_tolerance: f64,
    pub close_tolerance: f64,
    pub door: DoorProps,
    pub window: WindowProps,
    pub furniture: FurnitureSpec,
    pub room_type: RoomType,
}

impl Default for ToolDefaults {
    fn default() -> Self {
        Self {
            hit_tolerance: DEFAULT_HIT_TOLERANCE,
            close_tolerance: DEFAULT_CLOSE_TOLERANCE,
            door: DoorProps::default(),
            window: WindowProps::default(),
            furniture: FurnitureSpec::default(),
            room_type: RoomType::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) enum ToolState {
    #[default]
    Idle,
    WallDraft {
        start: Point2,
        preview: Point2,
    },
    RoomDraft {
        points: Vec<Point2>,
        preview: Point2,
    },
    OpeningHover {
        wall_id: EntityId,
        position: f64,
    },
    Dragging {
        target: Selection,
        origin: Point2,
        current: Point2,
    },
    MeasureDraft {
        start: Point2,
        current: Point2,
    },
}

/// 工具状态机：当前模式加上进行中的草图。
#[derive(Debug, Clone, Default)]
pub struct ToolMachine {
    pub(crate) mode: ToolMode,
    pub(crate) state: ToolState,
    pub(crate) defaults: ToolDefaults,
}

impl ToolMachine {
    pub fn new(defaults: ToolDefaults) -> Self {
        Self {
            mode: ToolMode::default(),
            state: ToolState::Idle,
            defaults,
        }
    }

    #[inline]
    pub fn mode(&self) -> ToolMode {
        self.mode
    }

    #[inline]
    pub fn defaults(&self) -> &ToolDefaults {
        &self.defaults
    }

    /// 切换模式会丢弃进行中的草图。
    pub(crate) fn set_mode(&mut self, mode: ToolMode) {
        self.mode = mode;
        self.state = ToolState::Idle;
    }

    #[inline]
    pub fn has_draft(&self) -> bool {
        self.state != ToolState::Idle
    }

    pub fn preview(&self) -> Option<DraftPreview> {
        match &self.state {
            ToolState::Idle => None,
            ToolState::WallDraft { start, preview } => Some(DraftPreview::Segment {
                start: *start,
                end: *preview,
            }),
            ToolState::RoomDraft { points, preview } => Some(DraftPreview::Polygon {
                points: points.clone(),
                cursor: *preview,
            }),
            ToolState::OpeningHover { wall_id, position } => Some(DraftPreview::Opening {
                kind: if self.mode == ToolMode::Window {
                    OpeningKind::Window
                } else {
                    OpeningKind::Door
                },
                wall_id: wall_id.clone(),
                position: *position,
            }),
            ToolState::Dragging {
                target,
                origin,
                current,
            } => Some(DraftPreview::Drag {
                target: target.clone(),
                delta: origin.vector_to(*current),
            }),
            ToolState::MeasureDraft { start, current } => Some(DraftPreview::Measure {
                start: *start,
                end: *current,
                distance: start.distance(*current),
            }),
        }
    }
}

type Step = (ToolState, ToolOutcome);

/// 按当前模式解释一个输入事件，必要时通过编辑器的历史包装接口提交修改。
pub(crate) fn interpret(editor: &mut Editor, event: InputEvent) -> ToolOutcome {
    if event == InputEvent::Cancel {
        let had_draft = editor.tools().has_draft();
        editor.tools_mut().state = ToolState::Idle;
        return if had_draft {
            ToolOutcome::Cancelled
        } else {
            ToolOutcome::Ignored
        };
    }
    if editor.project().is_none() {
        return match event {
            InputEvent::PointerDown(_) | InputEvent::Close => {
                ToolOutcome::Rejected(ModelError::ProjectNotOpen)
            }
            _ => ToolOutcome::Ignored,
        };
    }

    let mode = editor.tools().mode();
    let state = std::mem::take(&mut editor.tools_mut().state);
    let (next, outcome) = match mode {
        ToolMode::Select => select_step(editor, state, event),
        ToolMode::Wall => wall_step(editor, state, event),
        ToolMode::Room => room_step(editor, state, event),
        ToolMode::Door | ToolMode::Window => opening_step(editor, mode, state, event),
        ToolMode::Furniture => furniture_step(editor, state, event),
        ToolMode::Measure => measure_step(editor, state, event),
        ToolMode::Eraser => eraser_step(editor, state, event),
    };
    editor.tools_mut().state = next;

    if !matches!(outcome, ToolOutcome::Ignored | ToolOutcome::Draft) {
        debug!(tool = %mode, outcome = ?outcome, "工具事件已处理");
    }
    outcome
}

fn wall_step(editor: &mut Editor, state: ToolState, event: InputEvent) -> Step {
    match (state, event) {
        (ToolState::Idle, InputEvent::PointerDown(point)) => {
            let start = editor.snap(point, None);
            (
                ToolState::WallDraft {
                    start,
                    preview: start,
                },
                ToolOutcome::Draft,
            )
        }
        (ToolState::WallDraft { start, .. }, InputEvent::PointerMove(point)) => {
            let preview = editor.snap(point, Some(start));
            (ToolState::WallDraft { start, preview }, ToolOutcome::Draft)
        }
        (ToolState::WallDraft { start, .. }, InputEvent::PointerUp(point)) => {
            let end = editor.snap(point, Some(start));
            if end.approx_eq(start) {
                // 原地松开：进入“点击-点击”模式，等待第二次按下。
                (ToolState::WallDraft { start, preview: end }, ToolOutcome::Draft)
            } else {
                commit_wall(editor, start, end)
            }
        }
        (ToolState::WallDraft { start, .. }, InputEvent::PointerDown(point)) => {
            let end = editor.snap(point, Some(start));
            commit_wall(editor, start, end)
        }
        (ToolState::WallDraft { start, preview }, InputEvent::Close) => {
            commit_wall(editor, start, preview)
        }
        (state, _) => (state, ToolOutcome::Ignored),
    }
}

fn commit_wall(editor: &mut Editor, start: Point2, end: Point2) -> Step {
    let props = editor
        .project()
        .map(|project| WallProps::from_settings(&project.settings))
        .unwrap_or_default();
    match editor.add_wall(start, end, props) {
        Ok(id) => (ToolState::Idle, ToolOutcome::Committed(id)),
        Err(err) => (
            ToolState::WallDraft {
                start,
                preview: end,
            },
            ToolOutcome::Rejected(err),
        ),
    }
}

fn room_step(editor: &mut Editor, state: ToolState, event: InputEvent) -> Step {
    let close_tolerance = editor.tools().defaults().close_tolerance;
    match (state, event) {
        (ToolState::Idle, InputEvent::PointerDown(point)) => {
            let first = editor.snap(point, None);
            (
                ToolState::RoomDraft {
                    points: vec![first],
                    preview: first,
                },
                ToolOutcome::Draft,
            )
        }
        (ToolState::RoomDraft { mut points, .. }, InputEvent::PointerDown(point)) => {
            let last = points.last().copied();
            let vertex = editor.snap(point, last);
            let on_first = points.first().is_some_and(|first| {
                first.distance(point) <= close_tolerance || first.approx_eq(vertex)
            });
            if on_first && points.len() >= 3 {
                return commit_room(editor, points, vertex);
            }
            // 首顶点只用于闭合，不重复加入
            if !on_first && last.is_none_or(|last| !last.approx_eq(vertex)) {
                points.push(vertex);
            }
            (
                ToolState::RoomDraft {
                    points,
                    preview: vertex,
                },
                ToolOutcome::Draft,
            )
        }
        (ToolState::RoomDraft { points, .. }, InputEvent::PointerMove(point)) => {
            let preview = editor.snap(point, points.last().copied());
            (ToolState::RoomDraft { points, preview }, ToolOutcome::Draft)
        }
        (ToolState::RoomDraft { points, preview }, InputEvent::Close) => {
            commit_room(editor, points, preview)
        }
        (state, _) => (state, ToolOutcome::Ignored),
    }
}

fn commit_room(editor: &mut Editor, points: Vec<Point2>, preview: Point2) -> Step {
    let room_type = editor.tools().defaults().room_type;
    let ordinal = editor
        .project()
        .map(|project| project.rooms.len() + 1)
        .unwrap_or(1);
    let name = format!("{} {}", room_type.label(), ordinal);
    match editor.add_room(name, points.clone(), room_type) {
        Ok(id) => (ToolState::Idle, ToolOutcome::Committed(id)),
        Err(err) => (ToolState::RoomDraft { points, preview }, ToolOutcome::Rejected(err)),
    }
}

fn opening_step(
    editor: &mut Editor,
    mode: ToolMode,
    state: ToolState,
    event: InputEvent,
) -> Step {
    match event {
        InputEvent::PointerMove(point) => match editor.nearest_wall(point) {
            Some((wall_id, projection)) => (
                ToolState::OpeningHover {
                    wall_id,
                    position: projection.position,
                },
                ToolOutcome::Draft,
            ),
            None => (ToolState::Idle, ToolOutcome::Ignored),
        },
        InputEvent::PointerDown(point) => {
            let Some((wall_id, projection)) = editor.nearest_wall(point) else {
                return (state, ToolOutcome::Ignored);
            };
            let defaults = editor.tools().defaults();
            let spec = if mode == ToolMode::Window {
                OpeningSpec::Window(defaults.window.clone())
            } else {
                OpeningSpec::Door(defaults.door.clone())
            };
            match editor.add_opening(&wall_id, point, spec) {
                Ok(id) => (ToolState::Idle, ToolOutcome::Committed(id)),
                Err(err) => (
                    ToolState::OpeningHover {
                        wall_id,
                        position: projection.position,
                    },
                    ToolOutcome::Rejected(err),
                ),
            }
        }
        _ => (state, ToolOutcome::Ignored),
    }
}

fn furniture_step(editor: &mut Editor, state: ToolState, event: InputEvent) -> Step {
    let InputEvent::PointerDown(point) = event else {
        return (state, ToolOutcome::Ignored);
    };
    let position = editor.snap(point, None);
    let spec = editor.tools().defaults().furniture.clone();
    match editor.add_furniture(position, spec) {
        Ok(id) => (ToolState::Idle, ToolOutcome::Committed(id)),
        Err(err) => (state, ToolOutcome::Rejected(err)),
    }
}

fn select_step(editor: &mut Editor, state: ToolState, event: InputEvent) -> Step {
    match (state, event) {
        (_, InputEvent::PointerDown(point)) => {
            let hit = editor.hit_test(point);
            editor.set_selection(hit.clone());
            let next = match &hit {
                Some(target) => ToolState::Dragging {
                    target: target.clone(),
                    origin: point,
                    current: point,
                },
                None => ToolState::Idle,
            };
            (next, ToolOutcome::Selected(hit))
        }
        (ToolState::Dragging { target, origin, .. }, InputEvent::PointerMove(point)) => (
            ToolState::Dragging {
                target,
                origin,
                current: point,
            },
            ToolOutcome::Draft,
        ),
        (ToolState::Dragging { target, origin, .. }, InputEvent::PointerUp(point)) => {
            let delta = editor.snap_delta(origin.vector_to(point));
            if delta.length() <= geometry::EPSILON {
                return (ToolState::Idle, ToolOutcome::Ignored);
            }
            match editor.move_entity(target.target_type, &target.id, delta) {
                Ok(()) => (ToolState::Idle, ToolOutcome::Moved(target)),
                Err(err) => (
                    ToolState::Dragging {
                        target,
                        origin,
                        current: point,
                    },
                    ToolOutcome::Rejected(err),
                ),
            }
        }
        (state, _) => (state, ToolOutcome::Ignored),
    }
}

fn eraser_step(editor: &mut Editor, state: ToolState, event: InputEvent) -> Step {
    let InputEvent::PointerDown(point) = event else {
        return (state, ToolOutcome::Ignored);
    };
    let Some(target) = editor.hit_test(point) else {
        return (state, ToolOutcome::Ignored);
    };
    match editor.delete_entity(target.target_type, &target.id) {
        Ok(()) => (ToolState::Idle, ToolOutcome::Erased(target)),
        Err(err) => (state, ToolOutcome::Rejected(err)),
    }
}

fn measure_step(editor: &mut Editor, state: ToolState, event: InputEvent) -> Step {
    match (state, event) {
        (ToolState::Idle, InputEvent::PointerDown(point)) => {
            let start = editor.snap(point, None);
            (
                ToolState::MeasureDraft {
                    start,
                    current: start,
                },
                ToolOutcome::Draft,
            )
        }
        (ToolState::MeasureDraft { start, .. }, InputEvent::PointerMove(point)) => {
            let current = editor.snap(point, Some(start));
            (ToolState::MeasureDraft { start, current }, ToolOutcome::Draft)
        }
        (ToolState::MeasureDraft { start, .. }, InputEvent::PointerDown(point)) => {
            let end = editor.snap(point, Some(start));
            (ToolState::Idle, ToolOutcome::Measured(start.distance(end)))
        }
        (state, _) => (state, ToolOutcome::Ignored),
    }
}

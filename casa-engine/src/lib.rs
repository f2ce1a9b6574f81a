pub mod command;
pub mod history;
pub mod store;
pub mod tools;

pub mod errors {
    use casa_core::model::{EntityId, OpeningKind};
    use thiserror::Error;

    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum ModelError {
        #[error("no project is open")]
        ProjectNotOpen,
        #[error("degenerate geometry: {0}")]
        DegenerateGeometry(String),
        #[error("room polygon is self-intersecting")]
        InvalidPolygon,
        #[error("wall {0} does not exist")]
        UnknownWall(EntityId),
        #[error("opening spans {from:.3}..{to:.3} outside wall {wall} of length {length:.3}")]
        OutOfBounds {
            wall: EntityId,
            from: f64,
            to: f64,
            length: f64,
        },
        #[error("{kind} {opening} references missing wall {wall}")]
        OrphanReference {
            kind: OpeningKind,
            opening: EntityId,
            wall: EntityId,
        },
        #[error("invalid property: {0}")]
        InvalidProperty(String),
        #[error("entity with id {0} not found")]
        EntityNotFound(EntityId),
    }
}

pub mod editor {
    use std::fmt;
    use std::str::FromStr;

    use casa_core::geometry::{self, Point2, SegmentProjection, Vector2, Vector3};
    use casa_core::model::{
        EntityId, Exterior, FurnitureSpec, NewProjectOptions, OpeningSpec, ParseEnumError,
        Project, ProjectSettings, RoomType, WallProps,
    };
    use tracing::{debug, info, warn};

    use crate::errors::ModelError;
    use crate::history::{History, HistoryAction, TargetType};
    use crate::store::{LoadReport, ModelStore, Selection, WallEndpoint};
    use crate::tools::{self, DraftPreview, InputEvent, ToolDefaults, ToolMachine, ToolMode, ToolOutcome};

    /// 视图模式：平面图或三维透视。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum ViewMode {
        #[default]
        Plan2D,
        Perspective3D,
    }

    impl ViewMode {
        pub fn name(self) -> &'static str {
            match self {
                ViewMode::Plan2D => "2d",
                ViewMode::Perspective3D => "3d",
            }
        }
    }

    impl fmt::Display for ViewMode {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.name())
        }
    }

    impl FromStr for ViewMode {
        type Err = ParseEnumError;

        fn from_str(value: &str) -> Result<Self, Self::Err> {
            match value.trim().to_ascii_lowercase().as_str() {
                "2d" | "plan" => Ok(ViewMode::Plan2D),
                "3d" | "perspective" => Ok(ViewMode::Perspective3D),
                _ => Err(ParseEnumError {
                    kind: "视图模式",
                    value: value.to_string(),
                }),
            }
        }
    }

    /// 提供给视图适配层的只读快照。
    #[derive(Debug, Clone)]
    pub struct ViewSnapshot<'a> {
        pub project: Option<&'a Project>,
        pub selected: Option<&'a Selection>,
        pub tool_mode: ToolMode,
        pub view_mode: ViewMode,
        pub draft: Option<DraftPreview>,
        pub can_undo: bool,
        pub can_redo: bool,
    }

    /// 编辑器上下文：由应用根持有，聚合当前项目、撤销历史、工具状态机与界面状态。
    ///
    /// 所有修改都经由本类型的历史包装接口，成功后记录一条 [`HistoryAction`]。
    #[derive(Debug)]
    pub struct Editor {
        store: Option<ModelStore>,
        history: History,
        tools: ToolMachine,
        selected: Option<Selection>,
        view_mode: ViewMode,
    }

    impl Editor {
        pub fn new() -> Self {
            Self {
                store: None,
                history: History::new(),
                tools: ToolMachine::default(),
                selected: None,
                view_mode: ViewMode::default(),
            }
        }

        /// 指定撤销深度创建编辑器。
        pub fn with_history_depth(depth: usize) -> Self {
            Self {
                history: History::with_capacity(depth),
                ..Self::new()
            }
        }

        /// 新建空项目，替换当前项目并清空历史。
        pub fn create_project(&mut self, options: NewProjectOptions) -> &Project {
            self.reset_session();
            info!(name = %options.name, "新建项目");
            self.store.insert(ModelStore::new(options)).project()
        }

        /// 载入项目。不变量会重新校验，孤立的门窗被删除并记录在报告中。
        pub fn load_project(&mut self, project: Project) -> Result<LoadReport, ModelError> {
            let (store, report) = ModelStore::from_project(project)?;
            self.reset_session();
            info!(
                name = %store.project().name,
                entities = store.project().entity_count(),
                repaired = report.repaired.len(),
                "项目已载入"
            );
            self.store = Some(store);
            Ok(report)
        }

        /// 关闭当前项目并返回它。
        pub fn close_project(&mut self) -> Option<Project> {
            self.reset_session();
            self.store.take().map(ModelStore::into_project)
        }

        fn reset_session(&mut self) {
            self.history.clear();
            self.selected = None;
            let mode = self.tools.mode();
            self.tools.set_mode(mode);
        }

        #[inline]
        pub fn project(&self) -> Option<&Project> {
            self.store.as_ref().map(ModelStore::project)
        }

        /// 取得待持久化的项目副本，同时刷新 `updated_at`。
        pub fn serialize_project(&mut self) -> Result<Project, ModelError> {
            let store = self.store_mut()?;
            store.touch();
            Ok(store.project().clone())
        }

        /// 更新项目设置。设置变更不进入撤销历史。
        pub fn update_settings(&mut self, settings: ProjectSettings) -> Result<(), ModelError> {
            self.store_mut()?.set_settings(settings)?;
            debug!("项目设置已更新");
            Ok(())
        }

        fn store(&self) -> Result<&ModelStore, ModelError> {
            self.store.as_ref().ok_or(ModelError::ProjectNotOpen)
        }

        fn store_mut(&mut self) -> Result<&mut ModelStore, ModelError> {
            self.store.as_mut().ok_or(ModelError::ProjectNotOpen)
        }

        /// 对仓库执行一次修改；成功时记入历史，失败时原样返回错误。
        fn record<F>(&mut self, mutate: F) -> Result<EntityId, ModelError>
        where
            F: FnOnce(&mut ModelStore) -> Result<HistoryAction, ModelError>,
        {
            let store = self.store.as_mut().ok_or(ModelError::ProjectNotOpen)?;
            match mutate(store) {
                Ok(action) => {
                    let id = action.target_id.clone();
                    self.history.record(action);
                    self.prune_selection();
                    Ok(id)
                }
                Err(err) => {
                    warn!(error = %err, "修改被拒绝");
                    Err(err)
                }
            }
        }

        pub fn add_wall(
            &mut self,
            start: Point2,
            end: Point2,
            props: WallProps,
        ) -> Result<EntityId, ModelError> {
            self.record(|store| store.add_wall(start, end, props))
        }

        pub fn update_wall(
            &mut self,
            wall_id: &EntityId,
            props: WallProps,
        ) -> Result<(), ModelError> {
            self.record(|store| store.update_wall(wall_id, props))
                .map(drop)
        }

        pub fn move_wall_endpoint(
            &mut self,
            wall_id: &EntityId,
            endpoint: WallEndpoint,
            point: Point2,
        ) -> Result<(), ModelError> {
            self.record(|store| store.move_wall_endpoint(wall_id, endpoint, point))
                .map(drop)
        }

        pub fn add_room(
            &mut self,
            name: impl Into<String>,
            points: Vec<Point2>,
            room_type: RoomType,
        ) -> Result<EntityId, ModelError> {
            self.record(|store| store.add_room(name, points, room_type))
        }

        pub fn update_room_points(
            &mut self,
            room_id: &EntityId,
            points: Vec<Point2>,
        ) -> Result<(), ModelError> {
            self.record(|store| store.update_room_points(room_id, points))
                .map(drop)
        }

        pub fn add_opening(
            &mut self,
            wall_id: &EntityId,
            approx_position: Point2,
            spec: OpeningSpec,
        ) -> Result<EntityId, ModelError> {
            self.record(|store| store.add_opening(wall_id, approx_position, spec))
        }

        pub fn add_furniture(
            &mut self,
            position: Point2,
            spec: FurnitureSpec,
        ) -> Result<EntityId, ModelError> {
            self.record(|store| store.add_furniture(position, spec))
        }

        pub fn rotate_furniture(&mut self, id: &EntityId, rotation: f64) -> Result<(), ModelError> {
            self.record(|store| store.rotate_furniture(id, rotation))
                .map(drop)
        }

        pub fn scale_furniture(&mut self, id: &EntityId, scale: Vector3) -> Result<(), ModelError> {
            self.record(|store| store.scale_furniture(id, scale))
                .map(drop)
        }

        pub fn update_exterior(&mut self, exterior: Exterior) -> Result<(), ModelError> {
            self.record(|store| store.update_exterior(exterior))
                .map(drop)
        }

        pub fn move_entity(
            &mut self,
            target_type: TargetType,
            id: &EntityId,
            delta: Vector2,
        ) -> Result<(), ModelError> {
            self.record(|store| store.move_entity(target_type, id, delta))
                .map(drop)
        }

        pub fn delete_wall(&mut self, wall_id: &EntityId) -> Result<(), ModelError> {
            self.record(|store| store.delete_wall(wall_id)).map(drop)
        }

        pub fn delete_entity(
            &mut self,
            target_type: TargetType,
            id: &EntityId,
        ) -> Result<(), ModelError> {
            self.record(|store| store.delete_entity(target_type, id))
                .map(drop)
        }

        /// 撤销一步。没有可撤销的记录时返回 `Ok(None)`。
        pub fn undo(&mut self) -> Result<Option<&HistoryAction>, ModelError> {
            let store = self.store.as_mut().ok_or(ModelError::ProjectNotOpen)?;
            let applied = self.history.undo(store).is_some();
            self.prune_selection();
            Ok(if applied { self.history.entries().get(self.history.index()) } else { None })
        }

        /// 重做一步。没有可重做的记录时返回 `Ok(None)`。
        pub fn redo(&mut self) -> Result<Option<&HistoryAction>, ModelError> {
            let store = self.store.as_mut().ok_or(ModelError::ProjectNotOpen)?;
            let applied = self.history.redo(store).is_some();
            self.prune_selection();
            Ok(match self.history.index().checked_sub(1) {
                Some(last) if applied => self.history.entries().get(last),
                _ => None,
            })
        }

        #[inline]
        pub fn can_undo(&self) -> bool {
            self.store.is_some() && self.history.can_undo()
        }

        #[inline]
        pub fn can_redo(&self) -> bool {
            self.store.is_some() && self.history.can_redo()
        }

        #[inline]
        pub fn history(&self) -> &History {
            &self.history
        }

        /// 切换工具，进行中的草图被丢弃。
        pub fn set_tool_mode(&mut self, mode: ToolMode) {
            if self.tools.has_draft() {
                debug!(from = %self.tools.mode(), to = %mode, "切换工具，丢弃草图");
            }
            self.tools.set_mode(mode);
        }

        #[inline]
        pub fn tool_mode(&self) -> ToolMode {
            self.tools.mode()
        }

        #[inline]
        pub fn tools(&self) -> &ToolMachine {
            &self.tools
        }

        #[inline]
        pub(crate) fn tools_mut(&mut self) -> &mut ToolMachine {
            &mut self.tools
        }

        pub fn set_tool_defaults(&mut self, defaults: ToolDefaults) {
            self.tools.defaults = defaults;
        }

        /// 将输入事件交给当前工具处理。
        pub fn handle_input(&mut self, event: InputEvent) -> ToolOutcome {
            tools::interpret(self, event)
        }

        /// 选中指定实体。实体不存在时返回错误。
        pub fn select(&mut self, target_type: TargetType, id: &EntityId) -> Result<(), ModelError> {
            if !self.store()?.contains(target_type, id) {
                return Err(ModelError::EntityNotFound(id.clone()));
            }
            self.selected = Some(Selection::new(target_type, id.clone()));
            Ok(())
        }

        #[inline]
        pub fn clear_selection(&mut self) {
            self.selected = None;
        }

        #[inline]
        pub fn selected(&self) -> Option<&Selection> {
            self.selected.as_ref()
        }

        pub(crate) fn set_selection(&mut self, selection: Option<Selection>) {
            self.selected = selection;
        }

        /// 撤销、删除之后选中的实体可能已不存在。
        fn prune_selection(&mut self) {
            let stale = match (&self.selected, &self.store) {
                (Some(selection), Some(store)) => {
                    !store.contains(selection.target_type, &selection.id)
                }
                (Some(_), None) => true,
                (None, _) => false,
            };
            if stale {
                self.selected = None;
            }
        }

        /// 以工具默认容差做命中测试。
        pub fn hit_test(&self, point: Point2) -> Option<Selection> {
            let store = self.store.as_ref()?;
            store.hit_test(point, self.tools.defaults().hit_tolerance)
        }

        /// 容差范围内离指针最近的墙。
        pub fn nearest_wall(&self, point: Point2) -> Option<(EntityId, SegmentProjection)> {
            let store = self.store.as_ref()?;
            store
                .nearest_wall(point, self.tools.defaults().hit_tolerance)
                .map(|(wall, projection)| (wall.id.clone(), projection))
        }

        /// 按项目捕捉设置处理指针坐标；未打开项目时原样返回。
        pub fn snap(&self, point: Point2, reference: Option<Point2>) -> Point2 {
            match self.project() {
                Some(project) => {
                    geometry::snap_point(point, &project.settings.snap_settings(), reference)
                }
                None => point,
            }
        }

        /// 拖拽位移按网格取整。
        pub fn snap_delta(&self, delta: Vector2) -> Vector2 {
            match self.project() {
                Some(project) if project.settings.snap_to_grid => {
                    let snapped = geometry::snap_to_grid(
                        Point2::new(delta.x(), delta.y()),
                        project.settings.grid_size,
                    );
                    Vector2::new(snapped.x(), snapped.y())
                }
                _ => delta,
            }
        }

        #[inline]
        pub fn view_mode(&self) -> ViewMode {
            self.view_mode
        }

        pub fn set_view_mode(&mut self, mode: ViewMode) {
            self.view_mode = mode;
        }

        pub fn snapshot(&self) -> ViewSnapshot<'_> {
            ViewSnapshot {
                project: self.project(),
                selected: self.selected.as_ref(),
                tool_mode: self.tools.mode(),
                view_mode: self.view_mode,
                draft: self.tools.preview(),
                can_undo: self.can_undo(),
                can_redo: self.can_redo(),
            }
        }
    }

    impl Default for Editor {
        fn default() -> Self {
            Self::new()
        }
    }

    #[cfg(test)]
    mod tests {
        use casa_core::model::{DoorProps, Unit};

        use super::*;

        fn editor() -> Editor {
            let mut editor = Editor::new();
            editor.create_project(NewProjectOptions::default());
            editor
        }

        fn square(editor: &mut Editor) -> Vec<EntityId> {
            let corners = [
                Point2::new(0.0, 0.0),
                Point2::new(6.0, 0.0),
                Point2::new(6.0, 4.0),
                Point2::new(0.0, 4.0),
            ];
            (0..4)
                .map(|i| {
                    editor
                        .add_wall(corners[i], corners[(i + 1) % 4], WallProps::default())
                        .expect("wall")
                })
                .collect()
        }

        #[test]
        fn operations_require_open_project() {
            let mut editor = Editor::new();
            let err = editor
                .add_wall(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), WallProps::default())
                .unwrap_err();
            assert_eq!(err, ModelError::ProjectNotOpen);
            assert_eq!(editor.undo().unwrap_err(), ModelError::ProjectNotOpen);
            assert!(!editor.can_undo());
            assert!(editor.serialize_project().is_err());
        }

        #[test]
        fn rejected_mutation_is_not_recorded() {
            let mut editor = editor();
            let p = Point2::new(2.0, 2.0);
            assert!(editor.add_wall(p, p, WallProps::default()).is_err());
            assert!(editor.history().is_empty());
            assert!(!editor.can_undo());
        }

        #[test]
        fn undo_and_redo_walk_history() {
            let mut editor = editor();
            let walls = square(&mut editor);
            assert_eq!(editor.history().len(), 4);

            for _ in 0..3 {
                assert!(editor.undo().unwrap().is_some());
            }
            assert_eq!(editor.project().unwrap().walls.len(), 1);
            assert!(editor.can_redo());

            for _ in 0..3 {
                assert!(editor.redo().unwrap().is_some());
            }
            assert_eq!(editor.project().unwrap().walls.len(), 4);
            assert!(editor.redo().unwrap().is_none());
            for id in &walls {
                assert!(editor.project().unwrap().walls.contains_key(id));
            }

            // 撤销后的新修改会截断重做分支
            editor.undo().unwrap();
            editor
                .add_wall(Point2::new(10.0, 0.0), Point2::new(12.0, 0.0), WallProps::default())
                .unwrap();
            assert!(!editor.can_redo());
            assert_eq!(editor.history().len(), 4);
        }

        #[test]
        fn cascade_delete_undoes_as_one_step() {
            let mut editor = editor();
            let walls = square(&mut editor);
            let door = editor
                .add_opening(
                    &walls[0],
                    Point2::new(3.0, 0.0),
                    OpeningSpec::Door(DoorProps::default()),
                )
                .unwrap();
            let before = editor.project().unwrap().clone();

            editor.delete_wall(&walls[0]).unwrap();
            assert!(editor.project().unwrap().doors.is_empty());

            editor.undo().unwrap();
            let after = editor.project().unwrap();
            assert_eq!(after.walls, before.walls);
            assert_eq!(after.doors, before.doors);
            assert!(after.doors.contains_key(&door));
        }

        #[test]
        fn selection_is_pruned_when_entity_disappears() {
            let mut editor = editor();
            let walls = square(&mut editor);
            editor.select(TargetType::Wall, &walls[3]).unwrap();
            assert!(editor.selected().is_some());

            editor.undo().unwrap();
            assert!(editor.selected().is_none());

            let err = editor
                .select(TargetType::Wall, &EntityId::new("wall-404"))
                .unwrap_err();
            assert!(matches!(err, ModelError::EntityNotFound(_)));
        }

        #[test]
        fn load_project_clears_history_and_reports_repairs() {
            let mut editor = editor();
            square(&mut editor);
            let project = editor.serialize_project().unwrap();

            let report = editor.load_project(project).unwrap();
            assert!(report.is_clean());
            assert!(!editor.can_undo());
            assert_eq!(editor.project().unwrap().walls.len(), 4);
        }

        #[test]
        fn settings_changes_skip_history() {
            let mut editor = editor();
            let mut settings = editor.project().unwrap().settings.clone();
            settings.unit = Unit::Feet;
            settings.grid_size = 0.25;
            editor.update_settings(settings).unwrap();
            assert_eq!(editor.project().unwrap().settings.unit, Unit::Feet);
            assert!(editor.history().is_empty());

            let mut invalid = editor.project().unwrap().settings.clone();
            invalid.grid_size = -1.0;
            assert!(editor.update_settings(invalid).is_err());
        }

        #[test]
        fn snapshot_reflects_editor_state() {
            let mut editor = editor();
            editor.set_view_mode("3d".parse().unwrap());
            editor.set_tool_mode(ToolMode::Wall);
            editor.handle_input(InputEvent::PointerDown(Point2::new(0.0, 0.0)));

            let snapshot = editor.snapshot();
            assert_eq!(snapshot.view_mode, ViewMode::Perspective3D);
            assert_eq!(snapshot.tool_mode, ToolMode::Wall);
            assert!(snapshot.draft.is_some());
            assert!(!snapshot.can_undo);
            assert!(snapshot.project.is_some());

            let closed = editor.close_project();
            assert!(closed.is_some());
            assert!(editor.snapshot().project.is_none());
        }
    }
}

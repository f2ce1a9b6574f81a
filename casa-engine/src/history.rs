use std::fmt;

use casa_core::model::{Door, EntityId, Exterior, Furniture, Room, Wall, Window};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;

use crate::store::ModelStore;

pub const DEFAULT_HISTORY_DEPTH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Create,
    Update,
    Delete,
    Move,
    Rotate,
    Scale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Wall,
    Room,
    Door,
    Window,
    Furniture,
    Exterior,
}

impl TargetType {
    pub fn label(self) -> &'static str {
        match self {
            TargetType::Wall => "wall",
            TargetType::Room => "room",
            TargetType::Door => "door",
            TargetType::Window => "window",
            TargetType::Furniture => "furniture",
            TargetType::Exterior => "exterior",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 一次变更所涉及实体的完整状态。撤销/重做时以整体替换的方式回放。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub walls: Vec<Wall>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rooms: Vec<Room>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub doors: Vec<Door>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub windows: Vec<Window>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub furniture: Vec<Furniture>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exterior: Option<Exterior>,
}

impl StateSnapshot {
    pub fn wall(wall: Wall) -> Self {
        Self {
            walls: vec![wall],
            ..Self::default()
        }
    }

    pub fn room(room: Room) -> Self {
        Self {
            rooms: vec![room],
            ..Self::default()
        }
    }

    pub fn door(door: Door) -> Self {
        Self {
            doors: vec![door],
            ..Self::default()
        }
    }

    pub fn window(window: Window) -> Self {
        Self {
            windows: vec![window],
            ..Self::default()
        }
    }

    pub fn furniture(item: Furniture) -> Self {
        Self {
            furniture: vec![item],
            ..Self::default()
        }
    }

    pub fn exterior(exterior: Exterior) -> Self {
        Self {
            exterior: Some(exterior),
            ..Self::default()
        }
    }

    /// 快照中包含的实体数量（不含外部环境）。
    pub fn entity_count(&self) -> usize {
        self.walls.len()
            + self.rooms.len()
            + self.doors.len()
            + self.windows.len()
            + self.furniture.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entity_count() == 0 && self.exterior.is_none()
    }
}

/// 历史记录中的原子单元。复合编辑（如级联删除）也只占一条。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub target_type: TargetType,
    pub target_id: EntityId,
    pub previous_state: StateSnapshot,
    pub new_state: StateSnapshot,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl HistoryAction {
    pub fn new(
        kind: ActionKind,
        target_type: TargetType,
        target_id: EntityId,
        previous_state: StateSnapshot,
        new_state: StateSnapshot,
    ) -> Self {
        Self {
            kind,
            target_type,
            target_id,
            previous_state,
            new_state,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

/// 线性撤销栈。`index` 表示已应用的条目数：`[0, index)` 已提交，`[index, len)` 可重做。
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<HistoryAction>,
    index: usize,
    max_depth: usize,
}

impl History {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_DEPTH)
    }

    /// 指定最大深度，超出时丢弃最旧的条目。
    pub fn with_capacity(max_depth: usize) -> Self {
        let max_depth = max_depth.max(1);
        Self {
            entries: Vec::with_capacity(max_depth.min(DEFAULT_HISTORY_DEPTH)),
            index: 0,
            max_depth,
        }
    }

    /// 记录一条已提交的变更，并丢弃所有可重做的条目。
    pub fn record(&mut self, action: HistoryAction) {
        self.entries.truncate(self.index);
        debug!(
            kind = ?action.kind,
            target = %action.target_type,
            id = %action.target_id,
            "记录历史"
        );
        self.entries.push(action);
        if self.entries.len() > self.max_depth {
            let overflow = self.entries.len() - self.max_depth;
            self.entries.drain(..overflow);
        }
        self.index = self.entries.len();
    }

    /// 撤销最近一次变更，把 `previous_state` 回放到模型仓库。
    pub fn undo(&mut self, store: &mut ModelStore) -> Option<&HistoryAction> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        let action = &self.entries[self.index];
        store.apply(&action.new_state, &action.previous_state);
        debug!(index = self.index, id = %action.target_id, "撤销");
        Some(action)
    }

    /// 重做下一条变更，把 `new_state` 回放到模型仓库。
    pub fn redo(&mut self, store: &mut ModelStore) -> Option<&HistoryAction> {
        if self.index >= self.entries.len() {
            return None;
        }
        self.index += 1;
        let action = &self.entries[self.index - 1];
        store.apply(&action.previous_state, &action.new_state);
        debug!(index = self.index, id = %action.target_id, "重做");
        Some(action)
    }

    #[inline]
    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    #[inline]
    pub fn can_redo(&self) -> bool {
        self.index < self.entries.len()
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn entries(&self) -> &[HistoryAction] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index = 0;
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use casa_core::geometry::{Point2, Vector2};
    use casa_core::model::{DoorProps, NewProjectOptions, OpeningSpec, WallProps, WindowProps};

    use super::*;

    fn store() -> ModelStore {
        ModelStore::new(NewProjectOptions::default())
    }

    fn same_entities(a: &ModelStore, b: &ModelStore) -> bool {
        let (a, b) = (a.project(), b.project());
        a.walls == b.walls
            && a.rooms == b.rooms
            && a.doors == b.doors
            && a.windows == b.windows
            && a.furniture == b.furniture
            && a.exterior == b.exterior
    }

    #[test]
    fn undo_and_redo_are_noops_at_the_bounds() {
        let mut store = store();
        let mut history = History::new();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert!(history.undo(&mut store).is_none());
        assert!(history.redo(&mut store).is_none());

        let action = store
            .add_wall(Point2::new(0.0, 0.0), Point2::new(4.0, 0.0), WallProps::default())
            .unwrap();
        history.record(action);
        assert!(history.can_undo());
        assert!(history.redo(&mut store).is_none());
        assert_eq!(history.index(), 1);
    }

    #[test]
    fn wall_cascade_is_a_single_entry_and_undoes_atomically() {
        let mut store = store();
        let mut history = History::new();

        let wall = store
            .add_wall(Point2::new(0.0, 0.0), Point2::new(8.0, 0.0), WallProps::default())
            .unwrap();
        let wall_id = wall.target_id.clone();
        history.record(wall);
        for x in [1.5, 4.0] {
            let action = store
                .add_opening(
                    &wall_id,
                    Point2::new(x, 0.0),
                    OpeningSpec::Door(DoorProps::default()),
                )
                .unwrap();
            history.record(action);
        }
        let action = store
            .add_opening(
                &wall_id,
                Point2::new(6.5, 0.0),
                OpeningSpec::Window(WindowProps::default()),
            )
            .unwrap();
        history.record(action);
        let before_delete = store.clone();
        let recorded = history.len();

        let delete = store.delete_wall(&wall_id).unwrap();
        assert_eq!(delete.previous_state.walls.len(), 1);
        assert_eq!(delete.previous_state.doors.len(), 2);
        assert_eq!(delete.previous_state.windows.len(), 1);
        assert!(delete.new_state.is_empty());
        history.record(delete);
        assert_eq!(history.len(), recorded + 1);
        assert_eq!(store.project().entity_count(), 0);

        history.undo(&mut store).expect("undo delete");
        assert!(same_entities(&store, &before_delete));

        history.redo(&mut store).expect("redo delete");
        assert_eq!(store.project().entity_count(), 0);
    }

    #[test]
    fn undo_then_redo_restores_structurally_equal_state() {
        let mut store = store();
        let mut history = History::new();

        let wall = store
            .add_wall(Point2::new(0.0, 0.0), Point2::new(5.0, 0.0), WallProps::default())
            .unwrap();
        let wall_id = wall.target_id.clone();
        history.record(wall);
        history.record(
            store
                .add_opening(
                    &wall_id,
                    Point2::new(2.4, 0.1),
                    OpeningSpec::Door(DoorProps::default()),
                )
                .unwrap(),
        );
        history.record(
            store
                .move_entity(TargetType::Wall, &wall_id, Vector2::new(1.0, 2.0))
                .unwrap(),
        );
        history.record(
            store
                .add_room(
                    "Sala",
                    vec![
                        Point2::new(0.0, 0.0),
                        Point2::new(3.0, 0.0),
                        Point2::new(3.0, 3.0),
                    ],
                    Default::default(),
                )
                .unwrap(),
        );

        let final_state = store.clone();
        for n in 1..=history.len() {
            for _ in 0..n {
                history.undo(&mut store).expect("undo");
            }
            for _ in 0..n {
                history.redo(&mut store).expect("redo");
            }
            assert!(same_entities(&store, &final_state), "n = {n}");
        }

        while history.undo(&mut store).is_some() {}
        assert_eq!(store.project().entity_count(), 0);
    }

    #[test]
    fn recording_after_undo_discards_redo_tail() {
        let mut store = store();
        let mut history = History::new();
        for x in [1.0, 2.0, 3.0] {
            history.record(
                store
                    .add_wall(Point2::new(0.0, x), Point2::new(4.0, x), WallProps::default())
                    .unwrap(),
            );
        }
        history.undo(&mut store);
        history.undo(&mut store);
        assert_eq!(history.index(), 1);
        assert!(history.can_redo());

        history.record(
            store
                .add_wall(Point2::new(0.0, 9.0), Point2::new(4.0, 9.0), WallProps::default())
                .unwrap(),
        );
        assert_eq!(history.len(), 2);
        assert!(!history.can_redo());
        assert_eq!(store.project().walls.len(), 2);
    }

    #[test]
    fn history_is_bounded() {
        let mut store = store();
        let mut history = History::with_capacity(2);
        for x in [1.0, 2.0, 3.0] {
            history.record(
                store
                    .add_wall(Point2::new(0.0, x), Point2::new(4.0, x), WallProps::default())
                    .unwrap(),
            );
        }
        assert_eq!(history.len(), 2);
        assert_eq!(history.index(), 2);
        assert!(history.undo(&mut store).is_some());
        assert!(history.undo(&mut store).is_some());
        assert!(history.undo(&mut store).is_none());
        // 最早的墙已超出撤销深度，保留在模型中
        assert_eq!(store.project().walls.len(), 1);
    }
}

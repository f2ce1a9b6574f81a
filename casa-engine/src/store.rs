use std::collections::BTreeSet;

use casa_core::geometry::{self, Point2, Point3, SegmentProjection, Vector2, Vector3};
use casa_core::model::{
    Door, EntityId, Exterior, Furniture, FurnitureSpec, NewProjectOptions, Opening, OpeningKind,
    OpeningSpec, Project, ProjectSettings, Room, RoomType, Wall, WallProps, Window,
};
use tracing::{debug, warn};

use crate::errors::ModelError;
use crate::history::{ActionKind, HistoryAction, StateSnapshot, TargetType};

/// 外部环境在历史记录中使用的固定目标 ID。
pub const EXTERIOR_TARGET_ID: &str = "exterior";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallEndpoint {
    Start,
    End,
}

/// 选中的实体引用。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selection {
    pub target_type: TargetType,
    pub id: EntityId,
}

impl Selection {
    pub fn new(target_type: TargetType, id: EntityId) -> Self {
        Self { target_type, id }
    }
}

/// 载入项目时自动修复的问题。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub repaired: Vec<ModelError>,
}

impl LoadReport {
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.repaired.is_empty()
    }
}

/// 模型仓库：当前项目实体图的唯一数据源。
///
/// 所有修改都先校验再提交，失败时仓库保持不变；成功时返回描述变更的 [`HistoryAction`]。
#[derive(Debug, Clone)]
pub struct ModelStore {
    project: Project,
}

fn ensure_positive(value: f64, what: &str) -> Result<(), ModelError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ModelError::InvalidProperty(format!(
            "{what} must be positive, got {value}"
        )))
    }
}

fn validate_wall_geometry(start: Point2, end: Point2) -> Result<(), ModelError> {
    if !start.is_finite() || !end.is_finite() {
        return Err(ModelError::DegenerateGeometry(
            "wall endpoints must be finite".to_string(),
        ));
    }
    if start.approx_eq(end) {
        return Err(ModelError::DegenerateGeometry(
            "wall start and end coincide".to_string(),
        ));
    }
    Ok(())
}

fn validate_wall_dimensions(height: f64, thickness: f64) -> Result<(), ModelError> {
    ensure_positive(thickness, "wall thickness")?;
    ensure_positive(height, "wall height")
}

fn validate_room_points(points: &[Point2]) -> Result<(), ModelError> {
    if points.len() < 3 {
        return Err(ModelError::DegenerateGeometry(format!(
            "room needs at least 3 vertices, got {}",
            points.len()
        )));
    }
    if !geometry::is_simple_polygon(points) {
        return Err(ModelError::InvalidPolygon);
    }
    Ok(())
}

fn ensure_fits(opening: &impl Opening, wall: &Wall) -> Result<(), ModelError> {
    let length = wall.length();
    if opening.fits_within(length) {
        return Ok(());
    }
    let (from, to) = opening.footprint(length);
    Err(ModelError::OutOfBounds {
        wall: wall.id.clone(),
        from,
        to,
        length,
    })
}

fn validate_scale(scale: Vector3) -> Result<(), ModelError> {
    ensure_positive(scale.x(), "scale.x")?;
    ensure_positive(scale.y(), "scale.y")?;
    ensure_positive(scale.z(), "scale.z")
}

fn validate_exterior(exterior: &Exterior) -> Result<(), ModelError> {
    ensure_positive(exterior.terrain_size.x(), "terrain width")?;
    ensure_positive(exterior.terrain_size.y(), "terrain depth")?;
    if let Some(terrain) = &exterior.terrain {
        if !terrain.is_regular() {
            return Err(ModelError::InvalidProperty(
                "terrain elevation grid must be rectangular and finite".to_string(),
            ));
        }
    }
    Ok(())
}

/// 各类实体共享同一 ID 空间。
fn ensure_unique_ids(project: &Project) -> Result<(), ModelError> {
    let mut seen = BTreeSet::new();
    let ids = project
        .walls
        .keys()
        .chain(project.rooms.keys())
        .chain(project.doors.keys())
        .chain(project.windows.keys())
        .chain(project.furniture.keys())
        .chain(project.exterior.landscaping.iter().map(|item| &item.id));
    for id in ids {
        if !seen.insert(id) {
            return Err(ModelError::InvalidProperty(format!(
                "entity id {id} is used by more than one entity"
            )));
        }
    }
    Ok(())
}

impl ModelStore {
    /// 以空项目初始化。
    pub fn new(options: NewProjectOptions) -> Self {
        Self {
            project: Project::new(options),
        }
    }

    /// 载入外部项目并重新校验全部不变量。
    ///
    /// 跨集合重复的 ID、退化墙体、非法房间与越界洞口会使载入失败；引用缺失墙体的门窗会被删除并记录在报告中。
    pub fn from_project(mut project: Project) -> Result<(Self, LoadReport), ModelError> {
        ensure_unique_ids(&project)?;
        for wall in project.walls.values() {
            validate_wall_geometry(wall.start, wall.end)?;
            validate_wall_dimensions(wall.height, wall.thickness)?;
        }
        for room in project.rooms.values() {
            validate_room_points(room.points())?;
        }
        validate_settings(&project.settings)?;
        validate_exterior(&project.exterior)?;

        let mut report = LoadReport::default();

        let orphan_doors: Vec<EntityId> = project
            .doors
            .values()
            .filter(|door| !project.walls.contains_key(&door.wall_id))
            .map(|door| door.id.clone())
            .collect();
        for id in orphan_doors {
            if let Some(door) = project.doors.remove(&id) {
                warn!(door = %id, wall = %door.wall_id, "门引用的墙体不存在，已删除");
                report.repaired.push(ModelError::OrphanReference {
                    kind: OpeningKind::Door,
                    opening: id,
                    wall: door.wall_id,
                });
            }
        }

        let orphan_windows: Vec<EntityId> = project
            .windows
            .values()
            .filter(|window| !project.walls.contains_key(&window.wall_id))
            .map(|window| window.id.clone())
            .collect();
        for id in orphan_windows {
            if let Some(window) = project.windows.remove(&id) {
                warn!(window = %id, wall = %window.wall_id, "窗引用的墙体不存在，已删除");
                report.repaired.push(ModelError::OrphanReference {
                    kind: OpeningKind::Window,
                    opening: id,
                    wall: window.wall_id,
                });
            }
        }

        for door in project.doors.values() {
            ensure_positive(door.width, "door width")?;
            ensure_positive(door.height, "door height")?;
            if let Some(wall) = project.walls.get(&door.wall_id) {
                ensure_fits(door, wall)?;
            }
        }
        for window in project.windows.values() {
            ensure_positive(window.width, "window width")?;
            ensure_positive(window.height, "window height")?;
            if let Some(wall) = project.walls.get(&window.wall_id) {
                ensure_fits(window, wall)?;
            }
        }
        for item in project.furniture.values() {
            if !item.dimensions.is_positive() {
                return Err(ModelError::InvalidProperty(format!(
                    "furniture {} has non-positive dimensions",
                    item.id
                )));
            }
            validate_scale(item.scale)?;
        }

        debug!(
            walls = project.walls.len(),
            rooms = project.rooms.len(),
            repaired = report.repaired.len(),
            "项目校验完成"
        );
        Ok((Self { project }, report))
    }

    #[inline]
    pub fn project(&self) -> &Project {
        &self.project
    }

    #[inline]
    pub fn into_project(self) -> Project {
        self.project
    }

    #[inline]
    pub fn settings(&self) -> &ProjectSettings {
        &self.project.settings
    }

    /// 更新项目设置。设置不进入撤销历史。
    pub fn set_settings(&mut self, settings: ProjectSettings) -> Result<(), ModelError> {
        validate_settings(&settings)?;
        self.project.settings = settings;
        self.project.touch();
        Ok(())
    }

    #[inline]
    pub fn touch(&mut self) {
        self.project.touch();
    }

    #[inline]
    pub fn wall(&self, id: &EntityId) -> Option<&Wall> {
        self.project.walls.get(id)
    }

    #[inline]
    pub fn room(&self, id: &EntityId) -> Option<&Room> {
        self.project.rooms.get(id)
    }

    #[inline]
    pub fn door(&self, id: &EntityId) -> Option<&Door> {
        self.project.doors.get(id)
    }

    #[inline]
    pub fn window(&self, id: &EntityId) -> Option<&Window> {
        self.project.windows.get(id)
    }

    #[inline]
    pub fn furniture(&self, id: &EntityId) -> Option<&Furniture> {
        self.project.furniture.get(id)
    }

    pub fn contains(&self, target_type: TargetType, id: &EntityId) -> bool {
        match target_type {
            TargetType::Wall => self.project.walls.contains_key(id),
            TargetType::Room => self.project.rooms.contains_key(id),
            TargetType::Door => self.project.doors.contains_key(id),
            TargetType::Window => self.project.windows.contains_key(id),
            TargetType::Furniture => self.project.furniture.contains_key(id),
            TargetType::Exterior => id.as_str() == EXTERIOR_TARGET_ID,
        }
    }

    fn require_wall(&self, id: &EntityId) -> Result<&Wall, ModelError> {
        self.project
            .walls
            .get(id)
            .ok_or_else(|| ModelError::EntityNotFound(id.clone()))
    }

    fn require_room(&self, id: &EntityId) -> Result<&Room, ModelError> {
        self.project
            .rooms
            .get(id)
            .ok_or_else(|| ModelError::EntityNotFound(id.clone()))
    }

    fn require_furniture(&self, id: &EntityId) -> Result<&Furniture, ModelError> {
        self.project
            .furniture
            .get(id)
            .ok_or_else(|| ModelError::EntityNotFound(id.clone()))
    }

    /// 检查墙体所有依附洞口在给定几何下仍然落在墙内（按固定比例位置）。
    fn ensure_openings_fit(&self, wall: &Wall) -> Result<(), ModelError> {
        for door in self.project.doors_on(&wall.id) {
            ensure_fits(door, wall)?;
        }
        for window in self.project.windows_on(&wall.id) {
            ensure_fits(window, wall)?;
        }
        Ok(())
    }

    pub fn add_wall(
        &mut self,
        start: Point2,
        end: Point2,
        props: WallProps,
    ) -> Result<HistoryAction, ModelError> {
        validate_wall_geometry(start, end)?;
        validate_wall_dimensions(props.height, props.thickness)?;

        let id = self.project.allocate_id("wall");
        let wall = Wall {
            id: id.clone(),
            start,
            end,
            height: props.height,
            thickness: props.thickness,
            color: props.color,
            material: props.material,
            has_baseboard: false,
            baseboard_height: None,
        };
        debug!(wall = %id, length = wall.length(), "已添加墙体");
        self.project.walls.insert(id.clone(), wall.clone());
        self.project.touch();
        Ok(HistoryAction::new(
            ActionKind::Create,
            TargetType::Wall,
            id,
            StateSnapshot::default(),
            StateSnapshot::wall(wall),
        ))
    }

    /// 修改墙体的高度、厚度与材质。墙长不变，洞口无需重新锚定。
    pub fn update_wall(
        &mut self,
        wall_id: &EntityId,
        props: WallProps,
    ) -> Result<HistoryAction, ModelError> {
        validate_wall_dimensions(props.height, props.thickness)?;
        let before = self.require_wall(wall_id)?.clone();
        let mut after = before.clone();
        after.apply_props(&props);
        self.project.walls.insert(wall_id.clone(), after.clone());
        self.project.touch();
        Ok(HistoryAction::new(
            ActionKind::Update,
            TargetType::Wall,
            wall_id.clone(),
            StateSnapshot::wall(before),
            StateSnapshot::wall(after),
        ))
    }

    /// 移动墙体的一个端点。洞口保持比例位置随墙滑动；若任何洞口因此越界，则拒绝修改。
    pub fn move_wall_endpoint(
        &mut self,
        wall_id: &EntityId,
        endpoint: WallEndpoint,
        point: Point2,
    ) -> Result<HistoryAction, ModelError> {
        let before = self.require_wall(wall_id)?.clone();
        let mut after = before.clone();
        match endpoint {
            WallEndpoint::Start => after.start = point,
            WallEndpoint::End => after.end = point,
        }
        validate_wall_geometry(after.start, after.end)?;
        self.ensure_openings_fit(&after)?;

        debug!(wall = %wall_id, length = after.length(), "墙体端点已移动");
        self.project.walls.insert(wall_id.clone(), after.clone());
        self.project.touch();
        Ok(HistoryAction::new(
            ActionKind::Update,
            TargetType::Wall,
            wall_id.clone(),
            StateSnapshot::wall(before),
            StateSnapshot::wall(after),
        ))
    }

    pub fn add_room(
        &mut self,
        name: impl Into<String>,
        points: Vec<Point2>,
        room_type: RoomType,
    ) -> Result<HistoryAction, ModelError> {
        validate_room_points(&points)?;
        let id = self.project.allocate_id("room");
        let room = Room::new(
            id.clone(),
            name,
            points,
            room_type,
            self.project.settings.default_wall_height,
        );
        debug!(room = %id, area = room.area(), "已添加房间");
        self.project.rooms.insert(id.clone(), room.clone());
        self.project.touch();
        Ok(HistoryAction::new(
            ActionKind::Create,
            TargetType::Room,
            id,
            StateSnapshot::default(),
            StateSnapshot::room(room),
        ))
    }

    pub fn update_room_points(
        &mut self,
        room_id: &EntityId,
        points: Vec<Point2>,
    ) -> Result<HistoryAction, ModelError> {
        let before = self.require_room(room_id)?.clone();
        validate_room_points(&points)?;
        let mut after = before.clone();
        after.set_points(points);
        self.project.rooms.insert(room_id.clone(), after.clone());
        self.project.touch();
        Ok(HistoryAction::new(
            ActionKind::Update,
            TargetType::Room,
            room_id.clone(),
            StateSnapshot::room(before),
            StateSnapshot::room(after),
        ))
    }

    /// 在墙上放置门或窗。`approx_position` 为指针位置，先投影到墙中线得到比例位置。
    pub fn add_opening(
        &mut self,
        wall_id: &EntityId,
        approx_position: Point2,
        spec: OpeningSpec,
    ) -> Result<HistoryAction, ModelError> {
        let wall = self
            .project
            .walls
            .get(wall_id)
            .ok_or_else(|| ModelError::UnknownWall(wall_id.clone()))?;
        ensure_positive(spec.width(), "opening width")?;
        ensure_positive(spec.height(), "opening height")?;
        let position = wall.project(approx_position).position;

        match spec {
            OpeningSpec::Door(props) => {
                let mut door = Door {
                    id: EntityId::new(""),
                    wall_id: wall_id.clone(),
                    position,
                    width: props.width,
                    height: props.height,
                    door_type: props.door_type,
                    swing: props.swing,
                    material: props.material,
                };
                ensure_fits(&door, wall)?;
                door.id = self.project.allocate_id("door");
                let id = door.id.clone();
                debug!(door = %id, wall = %wall_id, position, "已添加门");
                self.project.doors.insert(id.clone(), door.clone());
                self.project.touch();
                Ok(HistoryAction::new(
                    ActionKind::Create,
                    TargetType::Door,
                    id,
                    StateSnapshot::default(),
                    StateSnapshot::door(door),
                ))
            }
            OpeningSpec::Window(props) => {
                if !props.sill_height.is_finite() || props.sill_height < 0.0 {
                    return Err(ModelError::InvalidProperty(format!(
                        "window sill height must be non-negative, got {}",
                        props.sill_height
                    )));
                }
                let mut window = Window {
                    id: EntityId::new(""),
                    wall_id: wall_id.clone(),
                    position,
                    width: props.width,
                    height: props.height,
                    sill_height: props.sill_height,
                    window_type: props.window_type,
                    material: props.material,
                };
                ensure_fits(&window, wall)?;
                window.id = self.project.allocate_id("window");
                let id = window.id.clone();
                debug!(window = %id, wall = %wall_id, position, "已添加窗");
                self.project.windows.insert(id.clone(), window.clone());
                self.project.touch();
                Ok(HistoryAction::new(
                    ActionKind::Create,
                    TargetType::Window,
                    id,
                    StateSnapshot::default(),
                    StateSnapshot::window(window),
                ))
            }
        }
    }

    /// 在平面坐标处放置家具，离地高度为 0。
    pub fn add_furniture(
        &mut self,
        position: Point2,
        spec: FurnitureSpec,
    ) -> Result<HistoryAction, ModelError> {
        if !position.is_finite() {
            return Err(ModelError::InvalidProperty(
                "furniture position must be finite".to_string(),
            ));
        }
        if !spec.dimensions.is_positive() {
            return Err(ModelError::InvalidProperty(
                "furniture dimensions must be positive".to_string(),
            ));
        }
        let id = self.project.allocate_id("furniture");
        let item = Furniture {
            id: id.clone(),
            name: spec.name,
            category: spec.category,
            position: Point3::new(position.x(), 0.0, position.y()),
            rotation: 0.0,
            scale: Vector3::splat(1.0),
            color: spec.color,
            material: spec.material,
            model_url: spec.model_url,
            dimensions: spec.dimensions,
        };
        debug!(furniture = %id, name = %item.name, "已放置家具");
        self.project.furniture.insert(id.clone(), item.clone());
        self.project.touch();
        Ok(HistoryAction::new(
            ActionKind::Create,
            TargetType::Furniture,
            id,
            StateSnapshot::default(),
            StateSnapshot::furniture(item),
        ))
    }

    pub fn rotate_furniture(
        &mut self,
        id: &EntityId,
        rotation: f64,
    ) -> Result<HistoryAction, ModelError> {
        if !rotation.is_finite() {
            return Err(ModelError::InvalidProperty(
                "rotation must be finite".to_string(),
            ));
        }
        let before = self.require_furniture(id)?.clone();
        let mut after = before.clone();
        after.set_rotation(rotation);
        self.project.furniture.insert(id.clone(), after.clone());
        self.project.touch();
        Ok(HistoryAction::new(
            ActionKind::Rotate,
            TargetType::Furniture,
            id.clone(),
            StateSnapshot::furniture(before),
            StateSnapshot::furniture(after),
        ))
    }

    pub fn scale_furniture(
        &mut self,
        id: &EntityId,
        scale: Vector3,
    ) -> Result<HistoryAction, ModelError> {
        validate_scale(scale)?;
        let before = self.require_furniture(id)?.clone();
        let mut after = before.clone();
        after.scale = scale;
        self.project.furniture.insert(id.clone(), after.clone());
        self.project.touch();
        Ok(HistoryAction::new(
            ActionKind::Scale,
            TargetType::Furniture,
            id.clone(),
            StateSnapshot::furniture(before),
            StateSnapshot::furniture(after),
        ))
    }

    pub fn update_exterior(&mut self, exterior: Exterior) -> Result<HistoryAction, ModelError> {
        validate_exterior(&exterior)?;
        let before = std::mem::replace(&mut self.project.exterior, exterior.clone());
        self.project.touch();
        Ok(HistoryAction::new(
            ActionKind::Update,
            TargetType::Exterior,
            EntityId::new(EXTERIOR_TARGET_ID),
            StateSnapshot::exterior(before),
            StateSnapshot::exterior(exterior),
        ))
    }

    /// 计算洞口平移后的新比例位置：先求绝对中心点，平移后重新投影到所属墙体。
    fn shifted_opening<O>(&self, opening: &O, delta: Vector2) -> Result<O, ModelError>
    where
        O: Opening + Clone,
    {
        let wall = self
            .project
            .walls
            .get(opening.wall_id())
            .ok_or_else(|| ModelError::UnknownWall(opening.wall_id().clone()))?;
        let center = wall.point_at(opening.position()).translate(delta);
        let mut moved = opening.clone();
        moved.set_position(wall.project(center).position);
        ensure_fits(&moved, wall)?;
        Ok(moved)
    }

    /// 通用平移：墙体平移两个端点，房间平移全部顶点，门窗沿墙重新投影，家具平移平面坐标。
    pub fn move_entity(
        &mut self,
        target_type: TargetType,
        id: &EntityId,
        delta: Vector2,
    ) -> Result<HistoryAction, ModelError> {
        if !delta.as_vec2().is_finite() {
            return Err(ModelError::InvalidProperty(
                "translation must be finite".to_string(),
            ));
        }

        let (previous_state, new_state) = match target_type {
            TargetType::Wall => {
                let before = self.require_wall(id)?.clone();
                let mut after = before.clone();
                after.translate(delta);
                self.project.walls.insert(id.clone(), after.clone());
                (StateSnapshot::wall(before), StateSnapshot::wall(after))
            }
            TargetType::Room => {
                let before = self.require_room(id)?.clone();
                let points = before.translated(delta);
                validate_room_points(&points)?;
                let mut after = before.clone();
                after.set_points(points);
                self.project.rooms.insert(id.clone(), after.clone());
                (StateSnapshot::room(before), StateSnapshot::room(after))
            }
            TargetType::Door => {
                let before = self
                    .project
                    .doors
                    .get(id)
                    .ok_or_else(|| ModelError::EntityNotFound(id.clone()))?
                    .clone();
                let after = self.shifted_opening(&before, delta)?;
                self.project.doors.insert(id.clone(), after.clone());
                (StateSnapshot::door(before), StateSnapshot::door(after))
            }
            TargetType::Window => {
                let before = self
                    .project
                    .windows
                    .get(id)
                    .ok_or_else(|| ModelError::EntityNotFound(id.clone()))?
                    .clone();
                let after = self.shifted_opening(&before, delta)?;
                self.project.windows.insert(id.clone(), after.clone());
                (StateSnapshot::window(before), StateSnapshot::window(after))
            }
            TargetType::Furniture => {
                let before = self.require_furniture(id)?.clone();
                let mut after = before.clone();
                after.translate(delta);
                self.project.furniture.insert(id.clone(), after.clone());
                (
                    StateSnapshot::furniture(before),
                    StateSnapshot::furniture(after),
                )
            }
            TargetType::Exterior => {
                return Err(ModelError::InvalidProperty(
                    "the exterior cannot be moved".to_string(),
                ));
            }
        };

        debug!(target = %target_type, id = %id, dx = delta.x(), dy = delta.y(), "实体已平移");
        self.project.touch();
        Ok(HistoryAction::new(
            ActionKind::Move,
            target_type,
            id.clone(),
            previous_state,
            new_state,
        ))
    }

    /// 删除墙体并级联删除其上的全部门窗，整体作为一条复合记录返回。
    pub fn delete_wall(&mut self, wall_id: &EntityId) -> Result<HistoryAction, ModelError> {
        self.require_wall(wall_id)?;

        let door_ids: Vec<EntityId> = self
            .project
            .doors_on(wall_id)
            .map(|door| door.id.clone())
            .collect();
        let window_ids: Vec<EntityId> = self
            .project
            .windows_on(wall_id)
            .map(|window| window.id.clone())
            .collect();

        let mut previous_state = StateSnapshot::default();
        if let Some(wall) = self.project.walls.remove(wall_id) {
            previous_state.walls.push(wall);
        }
        previous_state.doors = door_ids
            .iter()
            .filter_map(|id| self.project.doors.remove(id))
            .collect();
        previous_state.windows = window_ids
            .iter()
            .filter_map(|id| self.project.windows.remove(id))
            .collect();

        debug!(
            wall = %wall_id,
            doors = previous_state.doors.len(),
            windows = previous_state.windows.len(),
            "已删除墙体及其洞口"
        );
        self.project.touch();
        Ok(HistoryAction::new(
            ActionKind::Delete,
            TargetType::Wall,
            wall_id.clone(),
            previous_state,
            StateSnapshot::default(),
        ))
    }

    pub fn delete_entity(
        &mut self,
        target_type: TargetType,
        id: &EntityId,
    ) -> Result<HistoryAction, ModelError> {
        let missing = || ModelError::EntityNotFound(id.clone());
        let previous_state = match target_type {
            TargetType::Wall => return self.delete_wall(id),
            TargetType::Room => StateSnapshot::room(self.project.rooms.remove(id).ok_or_else(missing)?),
            TargetType::Door => StateSnapshot::door(self.project.doors.remove(id).ok_or_else(missing)?),
            TargetType::Window => {
                StateSnapshot::window(self.project.windows.remove(id).ok_or_else(missing)?)
            }
            TargetType::Furniture => {
                StateSnapshot::furniture(self.project.furniture.remove(id).ok_or_else(missing)?)
            }
            TargetType::Exterior => {
                return Err(ModelError::InvalidProperty(
                    "the exterior cannot be deleted".to_string(),
                ));
            }
        };
        debug!(target = %target_type, id = %id, "已删除实体");
        self.project.touch();
        Ok(HistoryAction::new(
            ActionKind::Delete,
            target_type,
            id.clone(),
            previous_state,
            StateSnapshot::default(),
        ))
    }

    /// 历史回放：移除 `from` 中的全部实体，再写入 `to` 中的实体。
    pub(crate) fn apply(&mut self, from: &StateSnapshot, to: &StateSnapshot) {
        for wall in &from.walls {
            self.project.walls.remove(&wall.id);
        }
        for room in &from.rooms {
            self.project.rooms.remove(&room.id);
        }
        for door in &from.doors {
            self.project.doors.remove(&door.id);
        }
        for window in &from.windows {
            self.project.windows.remove(&window.id);
        }
        for item in &from.furniture {
            self.project.furniture.remove(&item.id);
        }

        for wall in &to.walls {
            self.project.walls.insert(wall.id.clone(), wall.clone());
        }
        for room in &to.rooms {
            self.project.rooms.insert(room.id.clone(), room.clone());
        }
        for door in &to.doors {
            self.project.doors.insert(door.id.clone(), door.clone());
        }
        for window in &to.windows {
            self.project.windows.insert(window.id.clone(), window.clone());
        }
        for item in &to.furniture {
            self.project.furniture.insert(item.id.clone(), item.clone());
        }
        if let Some(exterior) = &to.exterior {
            self.project.exterior = exterior.clone();
        }
        self.project.touch();
    }

    /// 离指针最近的墙（按到墙面而非中线的距离），超出容差时返回 `None`。
    pub fn nearest_wall(
        &self,
        point: Point2,
        tolerance: f64,
    ) -> Option<(&Wall, SegmentProjection)> {
        self.project
            .walls
            .values()
            .map(|wall| {
                let projection = wall.project(point);
                (wall, projection, projection.distance - wall.thickness * 0.5)
            })
            .filter(|(_, _, gap)| *gap <= tolerance)
            .min_by(|a, b| a.2.total_cmp(&b.2))
            .map(|(wall, projection, _)| (wall, projection))
    }

    /// 洞口在墙上占据的线段到指针的距离（扣除半个墙厚）。
    fn opening_gap(&self, opening: &impl Opening, point: Point2) -> Option<f64> {
        let wall = self.project.walls.get(opening.wall_id())?;
        let length = wall.length();
        if length <= geometry::EPSILON {
            return None;
        }
        let (from, to) = opening.footprint(length);
        let a = wall.point_at(from / length);
        let b = wall.point_at(to / length);
        Some(geometry::distance_to_segment(point, a, b) - wall.thickness * 0.5)
    }

    /// 选择命中测试：家具优先，其次门窗、墙体，最后是包含该点的最小房间。
    pub fn hit_test(&self, point: Point2, tolerance: f64) -> Option<Selection> {
        if let Some(item) = self
            .project
            .furniture
            .values()
            .find(|item| item.footprint_contains(point))
        {
            return Some(Selection::new(TargetType::Furniture, item.id.clone()));
        }

        let doors = self.project.doors.values().filter_map(|door| {
            self.opening_gap(door, point)
                .map(|gap| (gap, Selection::new(TargetType::Door, door.id.clone())))
        });
        let windows = self.project.windows.values().filter_map(|window| {
            self.opening_gap(window, point)
                .map(|gap| (gap, Selection::new(TargetType::Window, window.id.clone())))
        });
        if let Some(hit) = closest_within(doors.chain(windows), tolerance) {
            return Some(hit);
        }

        let walls = self.project.walls.values().map(|wall| {
            (
                wall.project(point).distance - wall.thickness * 0.5,
                Selection::new(TargetType::Wall, wall.id.clone()),
            )
        });
        if let Some(hit) = closest_within(walls, tolerance) {
            return Some(hit);
        }

        self.project
            .rooms
            .values()
            .filter(|room| room.contains(point))
            .min_by(|a, b| a.area().total_cmp(&b.area()))
            .map(|room| Selection::new(TargetType::Room, room.id.clone()))
    }
}

fn closest_within(
    candidates: impl Iterator<Item = (f64, Selection)>,
    tolerance: f64,
) -> Option<Selection> {
    candidates
        .filter(|(gap, _)| *gap <= tolerance)
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, selection)| selection)
}

pub(crate) fn validate_settings(settings: &ProjectSettings) -> Result<(), ModelError> {
    ensure_positive(settings.grid_size, "grid size")?;
    ensure_positive(settings.default_wall_height, "default wall height")?;
    ensure_positive(settings.default_wall_thickness, "default wall thickness")?;
    if settings.snap_angles.iter().any(|angle| !angle.is_finite()) {
        return Err(ModelError::InvalidProperty(
            "snap angles must be finite".to_string(),
        ));
    }
    Ok(())
}

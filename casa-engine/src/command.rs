use std::collections::HashMap;

use crate::editor::{Editor, ViewMode};
use crate::tools::ToolMode;

#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub name: String,
    pub args: Vec<String>,
}

impl CommandRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct CommandResponse {
    pub success: bool,
    pub message: Option<String>,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse;
}

pub struct CommandContext<'a> {
    pub editor: &'a mut Editor,
}

/// 工具栏动作的分发器。
pub struct CommandBus {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl CommandBus {
    pub fn new() -> Self {
        let mut bus = Self {
            handlers: HashMap::new(),
        };
        bus.register(UndoCommand);
        bus.register(RedoCommand);
        bus.register(SetToolCommand);
        bus.register(SetViewCommand);
        bus.register(ClearSelectionCommand);
        bus.register(DeleteSelectionCommand);
        bus
    }

    pub fn register<H: CommandHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(handler.name(), Box::new(handler));
    }

    pub fn dispatch(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        if let Some(handler) = self.handlers.get(request.name.as_str()) {
            handler.execute(request, context)
        } else {
            CommandResponse::err(format!("未知命令: {}", request.name))
        }
    }

    pub fn available_commands(&self) -> impl Iterator<Item = &&'static str> {
        self.handlers.keys()
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

struct UndoCommand;

impl CommandHandler for UndoCommand {
    fn name(&self) -> &'static str {
        "undo"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        match context.editor.undo() {
            Ok(Some(action)) => CommandResponse::ok(format!(
                "已撤销 {} {}",
                action.target_type, action.target_id
            )),
            Ok(None) => CommandResponse::err("没有可撤销的操作"),
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

struct RedoCommand;

impl CommandHandler for RedoCommand {
    fn name(&self) -> &'static str {
        "redo"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        match context.editor.redo() {
            Ok(Some(action)) => CommandResponse::ok(format!(
                "已重做 {} {}",
                action.target_type, action.target_id
            )),
            Ok(None) => CommandResponse::err("没有可重做的操作"),
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

struct SetToolCommand;

impl CommandHandler for SetToolCommand {
    fn name(&self) -> &'static str {
        "set_tool"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let Some(raw) = request.args.first() else {
            return CommandResponse::err("用法: set_tool <mode>");
        };
        match raw.parse::<ToolMode>() {
            Ok(mode) => {
                context.editor.set_tool_mode(mode);
                CommandResponse::ok(format!("当前工具: {mode}"))
            }
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

struct SetViewCommand;

impl CommandHandler for SetViewCommand {
    fn name(&self) -> &'static str {
        "set_view"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let Some(raw) = request.args.first() else {
            return CommandResponse::err("用法: set_view <2d|3d>");
        };
        match raw.parse::<ViewMode>() {
            Ok(mode) => {
                context.editor.set_view_mode(mode);
                CommandResponse::ok(format!("当前视图: {mode}"))
            }
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

struct ClearSelectionCommand;

impl CommandHandler for ClearSelectionCommand {
    fn name(&self) -> &'static str {
        "clear_selection"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        context.editor.clear_selection();
        CommandResponse::ok("选中已清空")
    }
}

struct DeleteSelectionCommand;

impl CommandHandler for DeleteSelectionCommand {
    fn name(&self) -> &'static str {
        "delete_selection"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let Some(selection) = context.editor.selected().cloned() else {
            return CommandResponse::err("当前没有选中实体");
        };
        match context
            .editor
            .delete_entity(selection.target_type, &selection.id)
        {
            Ok(()) => CommandResponse::ok(format!(
                "已删除 {} {}",
                selection.target_type, selection.id
            )),
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use casa_core::geometry::Point2;
    use casa_core::model::{NewProjectOptions, WallProps};

    use super::*;
    use crate::history::TargetType;

    fn editor_with_wall() -> (Editor, casa_core::model::EntityId) {
        let mut editor = Editor::new();
        editor.create_project(NewProjectOptions::default());
        let id = editor
            .add_wall(Point2::new(0.0, 0.0), Point2::new(4.0, 0.0), WallProps::default())
            .unwrap();
        (editor, id)
    }

    #[test]
    fn undo_redo_commands_report_state() {
        let (mut editor, _) = editor_with_wall();
        let bus = CommandBus::new();
        let mut context = CommandContext {
            editor: &mut editor,
        };

        let response = bus.dispatch(&CommandRequest::new("undo"), &mut context);
        assert!(response.success);
        assert!(context.editor.project().unwrap().walls.is_empty());

        let response = bus.dispatch(&CommandRequest::new("undo"), &mut context);
        assert!(!response.success);

        let response = bus.dispatch(&CommandRequest::new("redo"), &mut context);
        assert!(response.success);
        assert_eq!(context.editor.project().unwrap().walls.len(), 1);
    }

    #[test]
    fn tool_and_view_commands_parse_arguments() {
        let (mut editor, _) = editor_with_wall();
        let bus = CommandBus::new();
        let mut context = CommandContext {
            editor: &mut editor,
        };

        let response = bus.dispatch(
            &CommandRequest::new("set_tool").with_arg("room"),
            &mut context,
        );
        assert!(response.success);
        assert_eq!(context.editor.tool_mode(), ToolMode::Room);

        let response = bus.dispatch(
            &CommandRequest::new("set_tool").with_arg("lasso"),
            &mut context,
        );
        assert!(!response.success);
        assert!(!bus.dispatch(&CommandRequest::new("set_tool"), &mut context).success);

        let response = bus.dispatch(
            &CommandRequest::new("set_view").with_arg("3d"),
            &mut context,
        );
        assert!(response.success);
        assert_eq!(context.editor.view_mode(), ViewMode::Perspective3D);

        let response = bus.dispatch(&CommandRequest::new("zoom_all"), &mut context);
        assert!(!response.success);
    }

    #[test]
    fn delete_selection_goes_through_history() {
        let (mut editor, wall) = editor_with_wall();
        editor.select(TargetType::Wall, &wall).unwrap();
        let bus = CommandBus::new();
        let mut context = CommandContext {
            editor: &mut editor,
        };

        let response = bus.dispatch(&CommandRequest::new("delete_selection"), &mut context);
        assert!(response.success);
        assert!(context.editor.project().unwrap().walls.is_empty());
        assert!(context.editor.selected().is_none());
        assert_eq!(context.editor.history().len(), 2);

        let response = bus.dispatch(&CommandRequest::new("delete_selection"), &mut context);
        assert!(!response.success);

        let response = bus.dispatch(&CommandRequest::new("clear_selection"), &mut context);
        assert!(response.success);
    }
}

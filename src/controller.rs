use crate::{
    geom::{Point, Rect, Vec2, point_in_rect, rect_from_corners},
    model::Tool,
    overlay::OverlayStack,
};

/// One interactive drag at a time; the variant encodes which tool owns it.
/// `LogoMoving` tracks the last pointer position because moves apply the
/// delta since the previous event, not since the drag start.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    CropDragging {
        start: Point,
        current: Point,
    },
    BlurDragging {
        start: Point,
        current: Point,
    },
    LogoMoving {
        last: Point,
    },
    LogoResizing,
}

/// Cursor feedback for pointer positions outside an active drag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CursorHint {
    #[default]
    Default,
    Crosshair,
    Move,
    SeResize,
}

/// State mutations requested by a transition; the engine applies them in
/// order. Keeping these as values makes the gesture machine testable
/// without surfaces or pixel data.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Effect {
    SelectLogo(usize),
    ClearSelection,
    MoveSelected(Vec2),
    ResizeSelected(Point),
    CommitCrop(Rect),
    CommitBlur(Rect),
    CommitLogoGesture,
    Redraw,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ToolController {
    drag: DragState,
}

impl ToolController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    pub fn is_dragging(&self) -> bool {
        self.drag != DragState::Idle
    }

    /// Abort any in-progress drag (tool switch, image replacement).
    pub fn cancel(&mut self) {
        self.drag = DragState::Idle;
    }

    pub fn pointer_down(
        &mut self,
        tool: Option<Tool>,
        point: Point,
        overlays: &OverlayStack,
    ) -> Vec<Effect> {
        let Some(tool) = tool else {
            return Vec::new();
        };
        match tool {
            Tool::Crop => {
                self.drag = DragState::CropDragging {
                    start: point,
                    current: point,
                };
                vec![Effect::Redraw]
            }
            Tool::Blur => {
                self.drag = DragState::BlurDragging {
                    start: point,
                    current: point,
                };
                Vec::new()
            }
            Tool::Logo => {
                if let Some(selected) = overlays.selected() {
                    let handle = selected.resize_handle_rect();
                    if point_in_rect(point, &handle) {
                        self.drag = DragState::LogoResizing;
                        return Vec::new();
                    }
                }
                if let Some(index) = overlays.hit_test(point) {
                    self.drag = DragState::LogoMoving { last: point };
                    vec![Effect::SelectLogo(index), Effect::Redraw]
                } else {
                    self.drag = DragState::Idle;
                    vec![Effect::ClearSelection, Effect::Redraw]
                }
            }
        }
    }

    /// While dragging, returns the effects of the move; otherwise returns
    /// no effects and the cursor hint for the hovered position.
    pub fn pointer_move(
        &mut self,
        tool: Option<Tool>,
        point: Point,
        overlays: &OverlayStack,
    ) -> (Vec<Effect>, Option<CursorHint>) {
        match &mut self.drag {
            DragState::CropDragging { current, .. } | DragState::BlurDragging { current, .. } => {
                *current = point;
                (vec![Effect::Redraw], None)
            }
            DragState::LogoMoving { last } => {
                let delta = point - *last;
                *last = point;
                (vec![Effect::MoveSelected(delta), Effect::Redraw], None)
            }
            DragState::LogoResizing => {
                (vec![Effect::ResizeSelected(point), Effect::Redraw], None)
            }
            DragState::Idle => (Vec::new(), Some(hover_cursor(tool, point, overlays))),
        }
    }

    pub fn pointer_up(&mut self, point: Point) -> Vec<Effect> {
        let drag = std::mem::take(&mut self.drag);
        match drag {
            DragState::Idle => Vec::new(),
            DragState::CropDragging { start, .. } => {
                vec![Effect::CommitCrop(rect_from_corners(start, point))]
            }
            DragState::BlurDragging { start, .. } => {
                vec![Effect::CommitBlur(rect_from_corners(start, point))]
            }
            DragState::LogoMoving { .. } | DragState::LogoResizing => {
                vec![Effect::CommitLogoGesture]
            }
        }
    }
}

fn hover_cursor(tool: Option<Tool>, point: Point, overlays: &OverlayStack) -> CursorHint {
    match tool {
        Some(Tool::Crop) => CursorHint::Crosshair,
        Some(Tool::Logo) => {
            if let Some(selected) = overlays.selected() {
                if point_in_rect(point, &selected.resize_handle_rect()) {
                    return CursorHint::SeResize;
                }
            }
            if overlays.hit_test(point).is_some() {
                CursorHint::Move
            } else {
                CursorHint::Default
            }
        }
        Some(Tool::Blur) | None => CursorHint::Default,
    }
}

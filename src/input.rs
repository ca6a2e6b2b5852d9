use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use glam::Vec2;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::camera::{DragMode, TrackballControls, WheelDelta};

/// Request from the UI, applied by the frame loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerCommand {
    /// Show the product at this catalog position.
    Select(usize),
    Next,
    Previous,
    ResetView,
    Resize { width: u32, height: u32 },
}

/// FIFO of viewer commands shared between event handlers and the frame loop.
///
/// Handlers only push; the session is mutated when the loop drains the queue.
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    commands: Rc<RefCell<VecDeque<ViewerCommand>>>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, command: ViewerCommand) {
        self.commands.borrow_mut().push_back(command);
    }

    /// Takes every queued command, oldest first.
    pub fn drain(&self) -> Vec<ViewerCommand> {
        self.commands.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.commands.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.borrow().is_empty()
    }
}

/// Keyboard shortcuts: digits pick a product, arrows cycle, `R`/`Home` reset the view.
pub fn command_for_key(code: KeyCode) -> Option<ViewerCommand> {
    let digit = match code {
        KeyCode::Digit1 | KeyCode::Numpad1 => 1,
        KeyCode::Digit2 | KeyCode::Numpad2 => 2,
        KeyCode::Digit3 | KeyCode::Numpad3 => 3,
        KeyCode::Digit4 | KeyCode::Numpad4 => 4,
        KeyCode::Digit5 | KeyCode::Numpad5 => 5,
        KeyCode::Digit6 | KeyCode::Numpad6 => 6,
        KeyCode::Digit7 | KeyCode::Numpad7 => 7,
        KeyCode::Digit8 | KeyCode::Numpad8 => 8,
        KeyCode::Digit9 | KeyCode::Numpad9 => 9,
        KeyCode::ArrowRight | KeyCode::ArrowDown => return Some(ViewerCommand::Next),
        KeyCode::ArrowLeft | KeyCode::ArrowUp => return Some(ViewerCommand::Previous),
        KeyCode::KeyR | KeyCode::Home => return Some(ViewerCommand::ResetView),
        _ => return None,
    };
    Some(ViewerCommand::Select(digit - 1))
}

pub fn drag_mode(button: MouseButton) -> Option<DragMode> {
    match button {
        MouseButton::Left => Some(DragMode::Rotate),
        MouseButton::Middle => Some(DragMode::Zoom),
        MouseButton::Right => Some(DragMode::Pan),
        _ => None,
    }
}

/// Converts winit's scroll (positive is up) into a downward-positive delta.
pub fn wheel_delta(delta: MouseScrollDelta) -> WheelDelta {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => WheelDelta::Lines(-y),
        MouseScrollDelta::PixelDelta(position) => WheelDelta::Pixels(-position.y as f32),
    }
}

/// Pointer gesture in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { mode: DragMode, position: Vec2 },
    Move(Vec2),
    Up,
    Wheel(WheelDelta),
}

impl PointerEvent {
    pub fn apply(self, controls: &mut TrackballControls) {
        match self {
            PointerEvent::Down { mode, position } => {
                controls.pointer_down(mode, position.x, position.y)
            }
            PointerEvent::Move(position) => controls.pointer_move(position.x, position.y),
            PointerEvent::Up => controls.pointer_up(),
            PointerEvent::Wheel(delta) => controls.wheel(delta),
        }
    }
}

/// Turns window events into pointer gestures and keyboard commands.
///
/// winit reports button presses without a position, so the last cursor
/// position is remembered here.
#[derive(Debug, Default)]
pub struct WindowInput {
    cursor: Vec2,
    pressed: Option<MouseButton>,
}

impl WindowInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor_moved(&mut self, x: f32, y: f32) -> PointerEvent {
        self.cursor = Vec2::new(x, y);
        PointerEvent::Move(self.cursor)
    }

    /// Only the button that started a drag can end it.
    pub fn button(&mut self, button: MouseButton, state: ElementState) -> Option<PointerEvent> {
        match state {
            ElementState::Pressed if self.pressed.is_none() => {
                let mode = drag_mode(button)?;
                self.pressed = Some(button);
                Some(PointerEvent::Down {
                    mode,
                    position: self.cursor,
                })
            }
            ElementState::Released if self.pressed == Some(button) => {
                self.pressed = None;
                Some(PointerEvent::Up)
            }
            _ => None,
        }
    }

    /// Dispatches one window event. Pointer gestures go straight to the
    /// trackball; key presses are queued as commands.
    pub fn handle(
        &mut self,
        event: &WindowEvent,
        controls: &mut TrackballControls,
        queue: &CommandQueue,
    ) {
        let pointer = match event {
            WindowEvent::CursorMoved { position, .. } => {
                Some(self.cursor_moved(position.x as f32, position.y as f32))
            }
            WindowEvent::MouseInput { state, button, .. } => self.button(*button, *state),
            WindowEvent::MouseWheel { delta, .. } => Some(PointerEvent::Wheel(wheel_delta(*delta))),
            WindowEvent::KeyboardInput { event, .. } => {
                if let (PhysicalKey::Code(code), ElementState::Pressed, false) =
                    (event.physical_key, event.state, event.repeat)
                {
                    if let Some(command) = command_for_key(code) {
                        queue.push(command);
                    }
                }
                None
            }
            _ => None,
        };
        if let Some(pointer) = pointer {
            pointer.apply(controls);
        }
    }
}

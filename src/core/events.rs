//! Application event definitions

use super::project::Project;
use super::surface::{LaunchMode, SurfaceId};

/// Events produced by background collaborators and handled on the run loop
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// A hosted surface's process exited
    SurfaceExited { surface: SurfaceId, code: Option<u32> },
}

/// Direction input from keyboard arrows or a controller stick/d-pad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Button input from keyboard shortcuts or a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Confirm,
    Back,
    Close,
}

/// Abstract input, already debounced by the device layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Direction(Direction),
    Button(Button),
}

/// A coordinator operation
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Launch { project: Project, mode: LaunchMode },
    SwitchTo(usize),
    Next,
    Previous,
    Close(usize),
    ReturnToLauncher,
    Teleport(String),
}

impl Command {
    /// Map an input event to a command, given the currently selected index
    pub fn from_input(event: InputEvent, selected: Option<usize>) -> Option<Self> {
        match event {
            InputEvent::Direction(Direction::Left | Direction::Up) => Some(Command::Previous),
            InputEvent::Direction(Direction::Right | Direction::Down) => Some(Command::Next),
            InputEvent::Button(Button::Back) => Some(Command::ReturnToLauncher),
            InputEvent::Button(Button::Close) => selected.map(Command::Close),
            InputEvent::Button(Button::Confirm) => selected.map(Command::SwitchTo),
        }
    }
}

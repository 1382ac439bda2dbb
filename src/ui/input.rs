/// Input state tracker.
///
/// Collects everything the terminal delivered since the last frame:
///   - mouse down / drag / up as pointer events in terminal coordinates
///   - key presses (release and repeat events are dropped)
///
/// Mapping terminal cells to grid cells is the renderer's job, since only
/// it knows where the board was drawn.

use std::time::Duration;

use crossterm::event::{
    self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Pointer {
    Down { col: u16, row: u16 },
    Drag { col: u16, row: u16 },
    Up,
}

pub struct InputState {
    /// Pointer events in arrival order.
    pub pointer: Vec<Pointer>,
    /// Key presses in arrival order.
    pub keys: Vec<KeyEvent>,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            pointer: Vec::with_capacity(16),
            keys: Vec::with_capacity(8),
        }
    }

    /// Drain all pending terminal events without blocking.
    /// Call once per frame, before the engine tick.
    pub fn drain_events(&mut self) {
        self.pointer.clear();
        self.keys.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => self.keys.push(key),
                Ok(Event::Mouse(m)) => {
                    if let Some(p) = pointer_from(m) {
                        self.pointer.push(p);
                    }
                }
                _ => {}
            }
        }
    }

    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.keys.iter().any(|k| k.code == code)
    }

    /// Convenience: was any of these keys pressed?
    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.keys.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }
}

fn pointer_from(m: MouseEvent) -> Option<Pointer> {
    match m.kind {
        MouseEventKind::Down(MouseButton::Left) => Some(Pointer::Down { col: m.column, row: m.row }),
        MouseEventKind::Drag(MouseButton::Left) => Some(Pointer::Drag { col: m.column, row: m.row }),
        MouseEventKind::Up(MouseButton::Left) => Some(Pointer::Up),
        _ => None,
    }
}

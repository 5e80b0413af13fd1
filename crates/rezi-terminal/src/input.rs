//! Translates real `crossterm` input into the core's [`Event`] wire shape
//! (§6, §10.5). Runs as a dedicated blocking task — `crossterm::event::read`
//! blocks the OS thread it's called on — and forwards encoded batches
//! through the same channel [`crate::backend::CrosstermBackend`] shares with
//! [`rezi_events::TickEventSource`], so `pollEvents` drains both uniformly.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyCode as CtKeyCode, KeyEventKind, MouseEventKind as CtMouseKind};
use rezi_events::{AsyncEventSource, Event, KeyAction, KeyCode, Mods, MouseButtons, MouseEvent, MouseEventKind, encode};
use tokio::task::JoinHandle;

/// How long `poll` waits between checking `stop` for a shutdown request.
/// `crossterm::event::read` itself has no cancellation hook, so this source
/// never blocks on it directly — it only calls `read()` once `poll` has
/// already confirmed an event is buffered and ready.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

fn translate_mods(m: event::KeyModifiers) -> Mods {
    let mut out = Mods::empty();
    if m.contains(event::KeyModifiers::SHIFT) {
        out |= Mods::SHIFT;
    }
    if m.contains(event::KeyModifiers::CONTROL) {
        out |= Mods::CTRL;
    }
    if m.contains(event::KeyModifiers::ALT) {
        out |= Mods::ALT;
    }
    if m.contains(event::KeyModifiers::SUPER) {
        out |= Mods::META;
    }
    out
}

fn translate_key_code(code: CtKeyCode) -> Option<KeyCode> {
    Some(match code {
        CtKeyCode::Char(c) => KeyCode::Char(c),
        CtKeyCode::Enter => KeyCode::Enter,
        CtKeyCode::Esc => KeyCode::Esc,
        CtKeyCode::Backspace => KeyCode::Backspace,
        CtKeyCode::Tab => KeyCode::Tab,
        CtKeyCode::Up => KeyCode::Up,
        CtKeyCode::Down => KeyCode::Down,
        CtKeyCode::Left => KeyCode::Left,
        CtKeyCode::Right => KeyCode::Right,
        CtKeyCode::Home => KeyCode::Home,
        CtKeyCode::End => KeyCode::End,
        CtKeyCode::PageUp => KeyCode::PageUp,
        CtKeyCode::PageDown => KeyCode::PageDown,
        CtKeyCode::Insert => KeyCode::Insert,
        CtKeyCode::Delete => KeyCode::Delete,
        CtKeyCode::F(n) => KeyCode::F(n),
        _ => return None,
    })
}

fn translate_key_action(kind: KeyEventKind) -> KeyAction {
    match kind {
        KeyEventKind::Press => KeyAction::Down,
        KeyEventKind::Release => KeyAction::Up,
        KeyEventKind::Repeat => KeyAction::Repeat,
    }
}

fn translate_mouse_kind(kind: CtMouseKind) -> Option<(MouseEventKind, i32, i32)> {
    Some(match kind {
        CtMouseKind::Down(_) => (MouseEventKind::Down, 0, 0),
        CtMouseKind::Up(_) => (MouseEventKind::Up, 0, 0),
        CtMouseKind::Drag(_) => (MouseEventKind::Drag, 0, 0),
        CtMouseKind::Moved => return None,
        CtMouseKind::ScrollDown => (MouseEventKind::Scroll, 0, 1),
        CtMouseKind::ScrollUp => (MouseEventKind::Scroll, 0, -1),
        CtMouseKind::ScrollLeft => (MouseEventKind::Scroll, -1, 0),
        CtMouseKind::ScrollRight => (MouseEventKind::Scroll, 1, 0),
    })
}

/// One real terminal input event translated to zero or more core [`Event`]s
/// (a single crossterm event is always exactly one core event today, but the
/// translation is expressed as `Option` to let an unsupported crossterm
/// variant — e.g. mouse-moved noise — translate to nothing without an error).
fn translate(ev: CtEvent) -> Option<Event> {
    match ev {
        CtEvent::Key(k) => {
            let code = translate_key_code(k.code)?;
            Some(Event::Key { code, mods: translate_mods(k.modifiers), timestamp_ms: 0, action: translate_key_action(k.kind) })
        }
        CtEvent::Mouse(m) => {
            let (kind, wheel_dx, wheel_dy) = translate_mouse_kind(m.kind)?;
            let buttons = match m.kind {
                CtMouseKind::Down(event::MouseButton::Left) | CtMouseKind::Drag(event::MouseButton::Left) => MouseButtons::LEFT,
                CtMouseKind::Down(event::MouseButton::Right) | CtMouseKind::Drag(event::MouseButton::Right) => MouseButtons::RIGHT,
                CtMouseKind::Down(event::MouseButton::Middle) | CtMouseKind::Drag(event::MouseButton::Middle) => MouseButtons::MIDDLE,
                _ => MouseButtons::empty(),
            };
            Some(Event::Mouse(MouseEvent {
                x: m.column as i32,
                y: m.row as i32,
                kind,
                buttons,
                wheel_dx,
                wheel_dy,
                mods: translate_mods(m.modifiers),
            }))
        }
        CtEvent::Resize(cols, rows) => Some(Event::Resize { cols, rows }),
        CtEvent::Paste(text) => Some(Event::Paste(text)),
        CtEvent::FocusGained => Some(Event::Focus(true)),
        CtEvent::FocusLost => Some(Event::Focus(false)),
    }
}

/// Reads real terminal input on a blocking task and forwards translated
/// events, one encoded batch per crossterm event, onto the shared channel.
/// Polls with a timeout rather than calling the blocking `read()` directly so
/// `stop` can be observed (and the task can return) within one poll interval
/// instead of waiting on whatever keypress would otherwise unblock it.
pub struct CrosstermInputEventSource {
    stop: Arc<AtomicBool>,
}

impl CrosstermInputEventSource {
    pub fn new(stop: Arc<AtomicBool>) -> Self {
        Self { stop }
    }
}

impl AsyncEventSource for CrosstermInputEventSource {
    fn name(&self) -> &'static str {
        "crossterm-input"
    }

    fn spawn(self: Box<Self>, tx: crossbeam_channel::Sender<Vec<u8>>) -> JoinHandle<()> {
        let stop = self.stop;
        tokio::task::spawn_blocking(move || {
            while !stop.load(Ordering::Relaxed) {
                match event::poll(POLL_INTERVAL) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(_) => break,
                }
                match event::read() {
                    Ok(raw) => {
                        if let Some(translated) = translate(raw) {
                            let bytes = encode(&[translated], 0, false);
                            if let Err(crossbeam_channel::TrySendError::Disconnected(_)) = tx.try_send(bytes) {
                                break;
                            }
                        }
                    }
                    Err(_) => break,
                }
            }
        })
    }
}

//! グローバルキーイベントの監視
//! rdev::listen でキーイベントを受け取り（抑制はしない）、
//! 組み合わせが揃ったらチャンネルへ通知する

use std::time::Instant;

use rdev::{EventType, Key, listen};
use tokio::sync::mpsc;

use super::combo_detector::ComboDetector;
use crate::domain::{KeyToken, Modifier, TerminalKey};
use crate::error::{CaptureError, Result};

/// キーイベントスレッドからの通知
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEvent {
    Triggered,
}

/// キーイベントを受けて組み合わせ検出器を駆動するハンドラー
pub struct KeyHandler {
    detector: ComboDetector,
    sender: mpsc::UnboundedSender<HotkeyEvent>,
}

impl KeyHandler {
    pub fn new(detector: ComboDetector, sender: mpsc::UnboundedSender<HotkeyEvent>) -> Self {
        Self { detector, sender }
    }

    /// キーイベントの監視を開始する（ブロッキング）
    ///
    /// 正常時は戻らない。監視を開始できなかった場合のみ `Err` を返す。
    pub fn start_listen(mut self) -> Result<()> {
        tracing::info!(hotkey = %self.detector.combo(), "listening for global hotkey");
        listen(move |event| {
            self.handle_event(&event.event_type, Instant::now());
        })
        .map_err(|e| CaptureError::HotkeyListenerFailed(format!("{e:?}")))
    }

    /// 1イベント分の処理。発火した場合は `true`
    ///
    /// キーイベントのコールバックから呼ばれるため、ここでは決してブロックしない。
    pub fn handle_event(&mut self, event_type: &EventType, now: Instant) -> bool {
        match event_type {
            EventType::KeyPress(key) => {
                let Some(token) = key_token(key) else {
                    return false;
                };
                if self.detector.on_press(token, now) {
                    if self.sender.send(HotkeyEvent::Triggered).is_err() {
                        tracing::warn!("hotkey receiver is gone; trigger dropped");
                    }
                    return true;
                }
            }
            EventType::KeyRelease(key) => {
                if let Some(token) = key_token(key) {
                    self.detector.on_release(token, now);
                }
            }
            _ => {}
        }
        false
    }
}

/// rdev のキーを正規化トークンへ変換する（左右の修飾キーは同一視）
pub fn key_token(key: &Key) -> Option<KeyToken> {
    let modifier = match key {
        Key::MetaLeft | Key::MetaRight => Some(Modifier::Cmd),
        Key::ControlLeft | Key::ControlRight => Some(Modifier::Ctrl),
        Key::Alt | Key::AltGr => Some(Modifier::Alt),
        Key::ShiftLeft | Key::ShiftRight => Some(Modifier::Shift),
        _ => None,
    };
    if let Some(modifier) = modifier {
        return Some(KeyToken::Modifier(modifier));
    }

    let terminal = match key {
        Key::KeyA => TerminalKey::Char('a'),
        Key::KeyB => TerminalKey::Char('b'),
        Key::KeyC => TerminalKey::Char('c'),
        Key::KeyD => TerminalKey::Char('d'),
        Key::KeyE => TerminalKey::Char('e'),
        Key::KeyF => TerminalKey::Char('f'),
        Key::KeyG => TerminalKey::Char('g'),
        Key::KeyH => TerminalKey::Char('h'),
        Key::KeyI => TerminalKey::Char('i'),
        Key::KeyJ => TerminalKey::Char('j'),
        Key::KeyK => TerminalKey::Char('k'),
        Key::KeyL => TerminalKey::Char('l'),
        Key::KeyM => TerminalKey::Char('m'),
        Key::KeyN => TerminalKey::Char('n'),
        Key::KeyO => TerminalKey::Char('o'),
        Key::KeyP => TerminalKey::Char('p'),
        Key::KeyQ => TerminalKey::Char('q'),
        Key::KeyR => TerminalKey::Char('r'),
        Key::KeyS => TerminalKey::Char('s'),
        Key::KeyT => TerminalKey::Char('t'),
        Key::KeyU => TerminalKey::Char('u'),
        Key::KeyV => TerminalKey::Char('v'),
        Key::KeyW => TerminalKey::Char('w'),
        Key::KeyX => TerminalKey::Char('x'),
        Key::KeyY => TerminalKey::Char('y'),
        Key::KeyZ => TerminalKey::Char('z'),
        Key::Num0 => TerminalKey::Char('0'),
        Key::Num1 => TerminalKey::Char('1'),
        Key::Num2 => TerminalKey::Char('2'),
        Key::Num3 => TerminalKey::Char('3'),
        Key::Num4 => TerminalKey::Char('4'),
        Key::Num5 => TerminalKey::Char('5'),
        Key::Num6 => TerminalKey::Char('6'),
        Key::Num7 => TerminalKey::Char('7'),
        Key::Num8 => TerminalKey::Char('8'),
        Key::Num9 => TerminalKey::Char('9'),
        Key::BackQuote => TerminalKey::Char('`'),
        Key::Minus => TerminalKey::Char('-'),
        Key::Equal => TerminalKey::Char('='),
        Key::LeftBracket => TerminalKey::Char('['),
        Key::RightBracket => TerminalKey::Char(']'),
        Key::BackSlash => TerminalKey::Char('\\'),
        Key::SemiColon => TerminalKey::Char(';'),
        Key::Quote => TerminalKey::Char('\''),
        Key::Comma => TerminalKey::Char(','),
        Key::Dot => TerminalKey::Char('.'),
        Key::Slash => TerminalKey::Char('/'),
        Key::F1 => TerminalKey::Function(1),
        Key::F2 => TerminalKey::Function(2),
        Key::F3 => TerminalKey::Function(3),
        Key::F4 => TerminalKey::Function(4),
        Key::F5 => TerminalKey::Function(5),
        Key::F6 => TerminalKey::Function(6),
        Key::F7 => TerminalKey::Function(7),
        Key::F8 => TerminalKey::Function(8),
        Key::F9 => TerminalKey::Function(9),
        Key::F10 => TerminalKey::Function(10),
        Key::F11 => TerminalKey::Function(11),
        Key::F12 => TerminalKey::Function(12),
        Key::Space => TerminalKey::Space,
        Key::Return | Key::KpReturn => TerminalKey::Enter,
        Key::Tab => TerminalKey::Tab,
        Key::Escape => TerminalKey::Escape,
        Key::Backspace => TerminalKey::Backspace,
        Key::Delete => TerminalKey::Delete,
        Key::Insert => TerminalKey::Insert,
        Key::Home => TerminalKey::Home,
        Key::End => TerminalKey::End,
        Key::PageUp => TerminalKey::PageUp,
        Key::PageDown => TerminalKey::PageDown,
        Key::UpArrow => TerminalKey::Up,
        Key::DownArrow => TerminalKey::Down,
        Key::LeftArrow => TerminalKey::Left,
        Key::RightArrow => TerminalKey::Right,
        _ => return None,
    };
    Some(KeyToken::Key(terminal))
}

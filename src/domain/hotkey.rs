//! ホットキー定義（`modifier+modifier+key` 形式）の解析
//!
//! 設定文字列は起動時に一度だけ `HotkeyCombo` に変換され、以降は不変です。
//! 左右の修飾キーは同じトークンに正規化されます。

use std::collections::BTreeSet;
use std::fmt;

use crate::error::{CaptureError, Result};

/// 修飾キー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Modifier {
    /// macOS の Command / 他 OS の Super(Win)
    Cmd,
    Ctrl,
    Alt,
    Shift,
}

impl Modifier {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "cmd" | "command" | "meta" | "super" | "win" => Some(Modifier::Cmd),
            "ctrl" | "control" => Some(Modifier::Ctrl),
            "alt" | "option" | "opt" => Some(Modifier::Alt),
            "shift" => Some(Modifier::Shift),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Modifier::Cmd => "cmd",
            Modifier::Ctrl => "ctrl",
            Modifier::Alt => "alt",
            Modifier::Shift => "shift",
        }
    }
}

/// 修飾キー以外の終端キー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalKey {
    /// 英数字・記号キー（小文字で保持）
    Char(char),
    /// F1〜F24
    Function(u8),
    Space,
    Enter,
    Tab,
    Escape,
    Backspace,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
}

/// ホットキーに使える記号キー
const PUNCTUATION_KEYS: &[char] = &['`', '-', '=', '[', ']', '\\', ';', '\'', ',', '.', '/'];

impl TerminalKey {
    fn parse(token: &str) -> Option<Self> {
        let mut chars = token.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if c.is_ascii_alphanumeric() || PUNCTUATION_KEYS.contains(&c) {
                return Some(TerminalKey::Char(c.to_ascii_lowercase()));
            }
            return None;
        }

        if let Some(num) = token.strip_prefix('f') {
            if let Ok(n) = num.parse::<u8>() {
                if (1..=24).contains(&n) {
                    return Some(TerminalKey::Function(n));
                }
            }
        }

        let key = match token {
            "space" => TerminalKey::Space,
            "enter" | "return" => TerminalKey::Enter,
            "tab" => TerminalKey::Tab,
            "esc" | "escape" => TerminalKey::Escape,
            "backspace" => TerminalKey::Backspace,
            "delete" | "del" => TerminalKey::Delete,
            "insert" | "ins" => TerminalKey::Insert,
            "home" => TerminalKey::Home,
            "end" => TerminalKey::End,
            "pageup" | "pgup" => TerminalKey::PageUp,
            "pagedown" | "pgdn" => TerminalKey::PageDown,
            "up" => TerminalKey::Up,
            "down" => TerminalKey::Down,
            "left" => TerminalKey::Left,
            "right" => TerminalKey::Right,
            _ => return None,
        };
        Some(key)
    }
}

impl fmt::Display for TerminalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalKey::Char(c) => write!(f, "{c}"),
            TerminalKey::Function(n) => write!(f, "f{n}"),
            TerminalKey::Space => f.write_str("space"),
            TerminalKey::Enter => f.write_str("enter"),
            TerminalKey::Tab => f.write_str("tab"),
            TerminalKey::Escape => f.write_str("esc"),
            TerminalKey::Backspace => f.write_str("backspace"),
            TerminalKey::Delete => f.write_str("delete"),
            TerminalKey::Insert => f.write_str("insert"),
            TerminalKey::Home => f.write_str("home"),
            TerminalKey::End => f.write_str("end"),
            TerminalKey::PageUp => f.write_str("pageup"),
            TerminalKey::PageDown => f.write_str("pagedown"),
            TerminalKey::Up => f.write_str("up"),
            TerminalKey::Down => f.write_str("down"),
            TerminalKey::Left => f.write_str("left"),
            TerminalKey::Right => f.write_str("right"),
        }
    }
}

/// 正規化済みキートークン
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyToken {
    Modifier(Modifier),
    Key(TerminalKey),
}

/// 解析済みのホットキー（修飾キー集合 + 終端キー1つ）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotkeyCombo {
    modifiers: BTreeSet<Modifier>,
    key: TerminalKey,
}

impl HotkeyCombo {
    /// `cmd+shift+v` 形式の文字列を解析する（大文字小文字は区別しない）
    ///
    /// 終端キーが無い・2つ以上ある・未知のトークンがある場合はエラー
    pub fn parse(spec: &str) -> Result<Self> {
        let invalid = |reason: String| CaptureError::InvalidHotkey {
            spec: spec.to_string(),
            reason,
        };

        let mut modifiers = BTreeSet::new();
        let mut key: Option<TerminalKey> = None;

        let tokens = spec
            .split('+')
            .map(|t| t.trim().trim_start_matches('<').trim_end_matches('>'))
            .map(str::to_ascii_lowercase)
            .filter(|t| !t.is_empty());

        for token in tokens {
            if let Some(m) = Modifier::parse(&token) {
                modifiers.insert(m);
                continue;
            }
            match TerminalKey::parse(&token) {
                Some(k) if key.is_none() => key = Some(k),
                Some(k) => {
                    return Err(invalid(format!(
                        "more than one non-modifier key (`{}` and `{}`)",
                        key.map(|k| k.to_string()).unwrap_or_default(),
                        k
                    )));
                }
                None => return Err(invalid(format!("unknown key token `{token}`"))),
            }
        }

        let key = key.ok_or_else(|| invalid("hotkey needs a non-modifier key".to_string()))?;
        Ok(Self { modifiers, key })
    }

    pub fn modifiers(&self) -> &BTreeSet<Modifier> {
        &self.modifiers
    }

    pub fn key(&self) -> TerminalKey {
        self.key
    }

    /// 組み合わせを構成する全トークン
    pub fn tokens(&self) -> impl Iterator<Item = KeyToken> + '_ {
        self.modifiers
            .iter()
            .copied()
            .map(KeyToken::Modifier)
            .chain(std::iter::once(KeyToken::Key(self.key)))
    }

    pub fn contains(&self, token: &KeyToken) -> bool {
        match token {
            KeyToken::Modifier(m) => self.modifiers.contains(m),
            KeyToken::Key(k) => self.key == *k,
        }
    }
}

impl fmt::Display for HotkeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.modifiers {
            write!(f, "{}+", m.as_str())?;
        }
        write!(f, "{}", self.key)
    }
}

impl std::str::FromStr for HotkeyCombo {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modifiers_and_key() {
        let combo = HotkeyCombo::parse("ctrl+alt+c").unwrap();
        assert_eq!(combo.key(), TerminalKey::Char('c'));
        assert!(combo.modifiers().contains(&Modifier::Ctrl));
        assert!(combo.modifiers().contains(&Modifier::Alt));
        assert_eq!(combo.tokens().count(), 3);
    }

    #[test]
    fn parsing_is_case_insensitive_and_tolerates_spaces() {
        let a = HotkeyCombo::parse("Cmd + SHIFT + V").unwrap();
        let b = HotkeyCombo::parse("cmd+shift+v").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "cmd+shift+v");
    }

    #[test]
    fn aliases_are_normalized() {
        let a = HotkeyCombo::parse("command+option+control+k").unwrap();
        let b = HotkeyCombo::parse("cmd+alt+ctrl+k").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn angle_bracket_style_is_accepted() {
        let combo = HotkeyCombo::parse("<cmd>+<shift>+v").unwrap();
        assert_eq!(combo.to_string(), "cmd+shift+v");
    }

    #[test]
    fn missing_terminal_key_fails_fast() {
        let err = HotkeyCombo::parse("ctrl+alt").unwrap_err();
        match err {
            CaptureError::InvalidHotkey { spec, reason } => {
                assert_eq!(spec, "ctrl+alt");
                assert!(reason.contains("non-modifier"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(HotkeyCombo::parse("").is_err());
    }

    #[test]
    fn two_terminal_keys_are_rejected() {
        assert!(HotkeyCombo::parse("ctrl+a+b").is_err());
    }

    #[test]
    fn unknown_tokens_are_rejected() {
        assert!(HotkeyCombo::parse("ctrl+hyper+a").is_err());
        assert!(HotkeyCombo::parse("ctrl+é").is_err());
    }

    #[test]
    fn named_and_function_keys() {
        assert_eq!(
            HotkeyCombo::parse("alt+F12").unwrap().key(),
            TerminalKey::Function(12)
        );
        assert_eq!(
            HotkeyCombo::parse("ctrl+space").unwrap().key(),
            TerminalKey::Space
        );
        assert!(HotkeyCombo::parse("alt+f25").is_err());
    }

    #[test]
    fn contains_checks_every_token() {
        let combo = HotkeyCombo::parse("ctrl+alt+c").unwrap();
        assert!(combo.contains(&KeyToken::Modifier(Modifier::Ctrl)));
        assert!(combo.contains(&KeyToken::Key(TerminalKey::Char('c'))));
        assert!(!combo.contains(&KeyToken::Modifier(Modifier::Shift)));
        assert!(!combo.contains(&KeyToken::Key(TerminalKey::Char('v'))));
    }

    #[test]
    fn named_keys_display_canonical_names() {
        for (spec, expected) in [
            ("ctrl+F5", "ctrl+f5"),
            ("cmd+escape", "cmd+esc"),
            ("alt+pgdn", "alt+pagedown"),
            ("shift+return", "shift+enter"),
            ("ctrl+space", "ctrl+space"),
        ] {
            let combo = HotkeyCombo::parse(spec).unwrap();
            assert_eq!(combo.to_string(), expected, "spec: {spec}");
            assert_eq!(HotkeyCombo::parse(expected).unwrap(), combo);
        }
    }
}

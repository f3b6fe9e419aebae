//! ホットキーの組み合わせ検出（エッジトリガー）
//!
//! 押下中のキー集合を持ち、組み合わせが揃った瞬間に一度だけ発火する。
//! 押しっぱなしでは再発火せず、組み合わせのキーを全て離してから
//! `release_settle` 経過後に再びアームされる。
//!
//! 時刻は呼び出し側から渡す（テストで時間を進められるように）。

use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::domain::{HotkeyCombo, KeyToken};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComboState {
    /// 組み合わせのキーが1つも押されていない
    Idle,
    /// 一部だけ押されている
    ArmedPartial,
    /// 発火済み。完全に離されるまで再発火しない
    Triggered,
}

#[derive(Debug)]
pub struct ComboDetector {
    combo: HotkeyCombo,
    release_settle: Duration,
    held: HashSet<KeyToken>,
    state: ComboState,
    /// Triggered → Idle へ戻る予定時刻
    rearm_at: Option<Instant>,
}

impl ComboDetector {
    pub fn new(combo: HotkeyCombo, release_settle: Duration) -> Self {
        Self {
            combo,
            release_settle,
            held: HashSet::new(),
            state: ComboState::Idle,
            rearm_at: None,
        }
    }

    pub fn combo(&self) -> &HotkeyCombo {
        &self.combo
    }

    pub fn state(&self) -> ComboState {
        self.state
    }

    /// キー押下。発火すべきときだけ `true`
    pub fn on_press(&mut self, token: KeyToken, now: Instant) -> bool {
        self.settle(now);
        self.held.insert(token);

        if self.state == ComboState::Triggered {
            return false;
        }
        if self.combo.tokens().all(|t| self.held.contains(&t)) {
            self.state = ComboState::Triggered;
            self.rearm_at = None;
            return true;
        }
        self.state = self.partial_state();
        false
    }

    /// キー解放
    pub fn on_release(&mut self, token: KeyToken, now: Instant) {
        self.settle(now);
        self.held.remove(&token);

        match self.state {
            ComboState::Triggered => {
                if !self.any_combo_key_held() {
                    self.rearm_at = Some(now + self.release_settle);
                    self.settle(now);
                }
            }
            _ => self.state = self.partial_state(),
        }
    }

    /// 押下状態を全て破棄する（解放イベントを取りこぼした場合など）
    pub fn reset(&mut self) {
        self.held.clear();
        self.state = ComboState::Idle;
        self.rearm_at = None;
    }

    /// 再アーム予定時刻を過ぎていれば Triggered から抜ける
    fn settle(&mut self, now: Instant) {
        let Some(rearm_at) = self.rearm_at else {
            return;
        };
        if now < rearm_at {
            return;
        }
        self.rearm_at = None;
        // 待機中に再び押された場合は次の完全解放まで Triggered のまま
        if !self.any_combo_key_held() {
            self.state = ComboState::Idle;
        }
    }

    fn any_combo_key_held(&self) -> bool {
        self.held.iter().any(|t| self.combo.contains(t))
    }

    fn partial_state(&self) -> ComboState {
        if self.any_combo_key_held() {
            ComboState::ArmedPartial
        } else {
            ComboState::Idle
        }
    }
}

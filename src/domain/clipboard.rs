//! クリップボード状態とキャプチャ結果のドメイン型
//!
//! `ClipboardSnapshot` はある瞬間のクリップボード全体（全エントリ × 全表現形式）を
//! 保持する不変値です。バックエンドはこれを読み書きするだけで、
//! テキスト抽出の優先順位はこのモジュールで一元的に決めます。

use std::fmt;
use std::time::Duration;

use super::markup;

/// 表現形式の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepresentationKind {
    PlainText,
    Html,
    Rtf,
    Image,
    FileReference,
    Other,
}

/// macOS の UTI / 旧 pasteboard 型名
pub mod uti {
    pub const PLAIN_TEXT: &str = "public.utf8-plain-text";
    pub const PLAIN_TEXT_UTF16: &str = "public.utf16-plain-text";
    pub const LEGACY_STRING: &str = "NSStringPboardType";
    pub const HTML: &str = "public.html";
    pub const LEGACY_HTML: &str = "Apple HTML pasteboard type";
    pub const RTF: &str = "public.rtf";
    pub const LEGACY_RTF: &str = "NeXT Rich Text Format v1.0 pasteboard type";
    pub const PNG: &str = "public.png";
    pub const TIFF: &str = "public.tiff";
    pub const FILE_URL: &str = "public.file-url";
}

/// MIME 表記（テキストのみのフォールバックやテストで使用）
pub mod mime {
    pub const PLAIN_TEXT: &str = "text/plain";
    pub const HTML: &str = "text/html";
    pub const RTF: &str = "text/rtf";
    pub const URI_LIST: &str = "text/uri-list";
}

impl RepresentationKind {
    /// 型識別子から種別を判定する（大文字小文字は区別しない）
    pub fn classify(type_id: &str) -> Self {
        let lower = type_id.to_ascii_lowercase();
        match lower.as_str() {
            "public.utf8-plain-text"
            | "public.utf16-plain-text"
            | "public.plain-text"
            | "public.text"
            | "nsstringpboardtype"
            | "text/plain"
            | "text/plain;charset=utf-8"
            | "utf8_string"
            | "string" => RepresentationKind::PlainText,
            "public.html" | "apple html pasteboard type" | "text/html" => RepresentationKind::Html,
            "public.rtf" | "text/rtf" | "application/rtf" => RepresentationKind::Rtf,
            "public.file-url" | "nsfilenamespboardtype" | "text/uri-list" => {
                RepresentationKind::FileReference
            }
            _ if lower.starts_with("next rich text format") => RepresentationKind::Rtf,
            _ if lower.starts_with("image/")
                || matches!(lower.as_str(), "public.png" | "public.tiff" | "public.jpeg") =>
            {
                RepresentationKind::Image
            }
            _ => RepresentationKind::Other,
        }
    }
}

/// 1つの表現形式（型識別子 + 生バイト列）
#[derive(Clone, PartialEq, Eq)]
pub struct Representation {
    pub type_id: String,
    pub data: Vec<u8>,
}

impl Representation {
    pub fn kind(&self) -> RepresentationKind {
        RepresentationKind::classify(&self.type_id)
    }

    /// UTF-8 / UTF-16 テキストとしてデコードする
    fn decode_text(&self) -> String {
        if self.type_id.eq_ignore_ascii_case(uti::PLAIN_TEXT_UTF16) {
            let units: Vec<u16> = self
                .data
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            return String::from_utf16_lossy(&units);
        }
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

impl fmt::Debug for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 中身はログに出さずサイズのみ
        f.debug_struct("Representation")
            .field("type_id", &self.type_id)
            .field("len", &self.data.len())
            .finish()
    }
}

/// クリップボード上の1エントリ。型識別子 → バイト列の対応（挿入順を保持）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardItem {
    representations: Vec<Representation>,
}

impl ClipboardItem {
    pub fn new() -> Self {
        Self::default()
    }

    /// 単一のプレーンテキスト表現を持つエントリ
    pub fn plain_text(text: &str) -> Self {
        let mut item = Self::new();
        item.insert(mime::PLAIN_TEXT, text.as_bytes().to_vec());
        item
    }

    /// 表現を追加する。同じ型識別子が既にあれば置き換える
    pub fn insert(&mut self, type_id: impl Into<String>, data: Vec<u8>) {
        let type_id = type_id.into();
        if let Some(existing) = self
            .representations
            .iter_mut()
            .find(|r| r.type_id == type_id)
        {
            existing.data = data;
        } else {
            self.representations.push(Representation { type_id, data });
        }
    }

    /// ビルダー形式の `insert`
    pub fn with(mut self, type_id: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(type_id, data.into());
        self
    }

    pub fn get(&self, type_id: &str) -> Option<&[u8]> {
        self.representations
            .iter()
            .find(|r| r.type_id == type_id)
            .map(|r| r.data.as_slice())
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.representations.iter().map(|r| r.type_id.as_str())
    }

    pub fn representations(&self) -> &[Representation] {
        &self.representations
    }

    pub fn is_empty(&self) -> bool {
        self.representations.is_empty()
    }

    pub fn size_bytes(&self) -> usize {
        self.representations.iter().map(|r| r.data.len()).sum()
    }

    fn first_of(&self, kind: RepresentationKind) -> Option<&Representation> {
        self.representations.iter().find(|r| r.kind() == kind)
    }
}

/// クリップボード全体の不変スナップショット
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardSnapshot {
    items: Vec<ClipboardItem>,
}

impl ClipboardSnapshot {
    pub fn new(items: Vec<ClipboardItem>) -> Self {
        Self { items }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// プレーンテキスト1件だけのスナップショット（テキストのみ環境用）
    pub fn from_text(text: &str) -> Self {
        Self::new(vec![ClipboardItem::plain_text(text)])
    }

    pub fn items(&self) -> &[ClipboardItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.iter().all(ClipboardItem::is_empty)
    }

    pub fn representation_count(&self) -> usize {
        self.items.iter().map(|i| i.representations.len()).sum()
    }

    pub fn total_size_bytes(&self) -> usize {
        self.items.iter().map(ClipboardItem::size_bytes).sum()
    }

    /// 先頭のプレーンテキスト表現（テキストのみのバックエンドが変化判定に使う）
    pub fn plain_text(&self) -> Option<String> {
        self.items
            .iter()
            .find_map(|item| item.first_of(RepresentationKind::PlainText))
            .map(Representation::decode_text)
    }

    /// 抽出優先順位に従ってテキストを取り出す
    ///
    /// 1. プレーンテキスト（どのエントリでも存在すれば必ず優先）
    /// 2. HTML からの導出
    /// 3. RTF からの導出
    /// 4. 空文字列
    pub fn extract_text(&self) -> String {
        self.plain_text()
            .or_else(|| self.html_text())
            .or_else(|| self.rtf_text())
            .unwrap_or_default()
    }

    /// HTML 表現から導出したテキスト（空になるものは除く）
    pub fn html_text(&self) -> Option<String> {
        self.items
            .iter()
            .filter_map(|item| item.first_of(RepresentationKind::Html))
            .map(|html| markup::html_to_text(&html.decode_text()))
            .find(|text| !text.is_empty())
    }

    /// RTF 表現から簡易変換で導出したテキスト
    pub fn rtf_text(&self) -> Option<String> {
        self.rtf_representations()
            .map(|rtf| markup::rtf_to_text(&rtf.decode_text()))
            .find(|text| !text.is_empty())
    }

    /// 各エントリの先頭の RTF 表現
    pub fn rtf_representations(&self) -> impl Iterator<Item = &Representation> {
        self.items
            .iter()
            .filter_map(|item| item.first_of(RepresentationKind::Rtf))
    }
}

/// 1回のキャプチャの外部から見える結果
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CaptureResult {
    pub text: String,
    pub changed: bool,
}

impl CaptureResult {
    /// クリップボードが変化しなかった（選択なし）
    pub fn unchanged() -> Self {
        Self::default()
    }

    pub fn captured(text: String) -> Self {
        Self {
            text,
            changed: true,
        }
    }

    /// 送信対象になり得るか
    pub fn is_dispatchable(&self) -> bool {
        self.changed && !self.text.trim().is_empty()
    }
}

/// 1戦略の試行結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// リビジョンが変化した
    Changed,
    /// タイムアウトまで変化なし
    Unchanged,
    /// 戦略自体が失敗した
    Errored(String),
}

/// 1戦略の試行記録（永続化しない）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureAttempt {
    pub strategy: &'static str,
    pub outcome: AttemptOutcome,
    pub elapsed: Duration,
}

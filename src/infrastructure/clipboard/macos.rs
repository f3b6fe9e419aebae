//! NSPasteboard を直接操作するネイティブ実装
//!
//! `changeCount` をリビジョンとして使い、`pasteboardItems` の全型を
//! バイト列のまま保存・復元する。

use std::ffi::CStr;
use std::os::raw::c_char;

use cocoa::base::{BOOL, NO, id, nil};
use cocoa::foundation::{NSAutoreleasePool, NSInteger, NSString, NSUInteger};
use objc::{class, msg_send, sel, sel_impl};

use super::ClipboardBackend;
use crate::domain::clipboard::uti;
use crate::domain::{ClipboardItem, ClipboardSnapshot};
use crate::error::{CaptureError, Result};

/// `[NSPasteboard generalPasteboard]` のラッパ
pub struct MacPasteboard {
    _private: (),
}

/// 呼び出しごとのオートリリースプール。スコープを抜けると drain する
fn autorelease_pool() -> scopeguard::ScopeGuard<id, impl FnOnce(id)> {
    let pool = unsafe { NSAutoreleasePool::new(nil) };
    scopeguard::guard(pool, |pool| unsafe {
        let _: () = msg_send![pool, drain];
    })
}

fn general_pasteboard() -> Result<id> {
    let pasteboard: id = unsafe { msg_send![class!(NSPasteboard), generalPasteboard] };
    if pasteboard == nil {
        return Err(CaptureError::ClipboardUnavailable(
            "generalPasteboard returned nil".to_string(),
        ));
    }
    Ok(pasteboard)
}

/// NSString → Rust String
unsafe fn nsstring_to_string(value: id) -> Option<String> {
    if value == nil {
        return None;
    }
    let ptr: *const c_char = unsafe { msg_send![value, UTF8String] };
    if ptr.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

/// NSData → Vec<u8>
unsafe fn nsdata_to_vec(data: id) -> Option<Vec<u8>> {
    if data == nil {
        return None;
    }
    let len: NSUInteger = unsafe { msg_send![data, length] };
    if len == 0 {
        return Some(Vec::new());
    }
    let bytes: *const u8 = unsafe { msg_send![data, bytes] };
    if bytes.is_null() {
        return None;
    }
    Some(unsafe { std::slice::from_raw_parts(bytes, len as usize) }.to_vec())
}

fn autoreleased_nsstring(value: &str) -> id {
    unsafe { NSString::alloc(nil).init_str(value).autorelease() }
}

/// AppKit の RTF パーサで本文を取り出す
///
/// HTML は WebKit をメインスレッド外で起動してしまうため AppKit では変換しない
unsafe fn rtf_via_appkit(data: id) -> Option<String> {
    let attributed: id = unsafe { msg_send![class!(NSAttributedString), alloc] };
    let attributed: id =
        unsafe { msg_send![attributed, initWithRTF: data documentAttributes: nil] };
    if attributed == nil {
        return None;
    }
    let text = unsafe {
        let string: id = msg_send![attributed, string];
        let text = nsstring_to_string(string);
        let _: () = msg_send![attributed, release];
        text
    };
    text.filter(|t| !t.trim().is_empty())
}

impl MacPasteboard {
    pub fn new() -> Result<Self> {
        let _pool = autorelease_pool();
        general_pasteboard()?;
        Ok(Self { _private: () })
    }

    #[cfg(test)]
    fn data_for_type(&self, type_id: &str) -> Result<Option<Vec<u8>>> {
        let _pool = autorelease_pool();
        let pasteboard = general_pasteboard()?;
        let data: id = unsafe { msg_send![pasteboard, dataForType: autoreleased_nsstring(type_id)] };
        Ok(unsafe { nsdata_to_vec(data) })
    }
}

impl ClipboardBackend for MacPasteboard {
    fn name(&self) -> &'static str {
        "macos-pasteboard"
    }

    fn is_full_fidelity(&self) -> bool {
        true
    }

    fn revision(&self) -> Result<u64> {
        let _pool = autorelease_pool();
        let pasteboard = general_pasteboard()?;
        let count: NSInteger = unsafe { msg_send![pasteboard, changeCount] };
        Ok(count as u64)
    }

    fn snapshot(&self) -> Result<ClipboardSnapshot> {
        let _pool = autorelease_pool();
        let pasteboard = general_pasteboard()?;

        let items: id = unsafe { msg_send![pasteboard, pasteboardItems] };
        if items == nil {
            return Ok(ClipboardSnapshot::empty());
        }

        let mut snapshot_items = Vec::new();
        unsafe {
            let item_count: NSUInteger = msg_send![items, count];
            for i in 0..item_count {
                let item: id = msg_send![items, objectAtIndex: i];
                let types: id = msg_send![item, types];
                if types == nil {
                    continue;
                }
                let mut entry = ClipboardItem::new();
                let type_count: NSUInteger = msg_send![types, count];
                for j in 0..type_count {
                    let type_id: id = msg_send![types, objectAtIndex: j];
                    let Some(name) = nsstring_to_string(type_id) else {
                        continue;
                    };
                    let data: id = msg_send![item, dataForType: type_id];
                    if let Some(bytes) = nsdata_to_vec(data) {
                        entry.insert(name, bytes);
                    }
                }
                snapshot_items.push(entry);
            }
        }

        let snapshot = ClipboardSnapshot::new(snapshot_items);
        tracing::debug!(
            items = snapshot.items().len(),
            representations = snapshot.representation_count(),
            total_size_bytes = snapshot.total_size_bytes(),
            "captured pasteboard snapshot"
        );
        Ok(snapshot)
    }

    fn restore(&self, snapshot: Option<&ClipboardSnapshot>) -> Result<()> {
        let Some(snapshot) = snapshot else {
            return Ok(());
        };
        let _pool = autorelease_pool();
        let pasteboard = general_pasteboard()?;

        unsafe {
            let _: NSInteger = msg_send![pasteboard, clearContents];
            if snapshot.is_empty() {
                return Ok(());
            }

            let objects: id = msg_send![class!(NSMutableArray), array];
            for item in snapshot.items().iter().filter(|i| !i.is_empty()) {
                let pasteboard_item: id = msg_send![class!(NSPasteboardItem), new];
                let pasteboard_item: id = msg_send![pasteboard_item, autorelease];
                for rep in item.representations() {
                    let data: id = msg_send![class!(NSData),
                        dataWithBytes: rep.data.as_ptr() as *const std::os::raw::c_void
                        length: rep.data.len() as NSUInteger];
                    let ok: BOOL = msg_send![pasteboard_item,
                        setData: data
                        forType: autoreleased_nsstring(&rep.type_id)];
                    if ok == NO {
                        tracing::debug!(type_id = %rep.type_id, "pasteboard item rejected type");
                    }
                }
                let _: () = msg_send![objects, addObject: pasteboard_item];
            }

            let written: BOOL = msg_send![pasteboard, writeObjects: objects];
            if written == NO {
                return Err(CaptureError::ClipboardWrite(
                    "writeObjects: returned NO".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn read_text(&self) -> Result<String> {
        let _pool = autorelease_pool();
        let pasteboard = general_pasteboard()?;

        // stringForType: は UTF-16 や旧型名からの変換も行う
        let plain = unsafe {
            let value: id =
                msg_send![pasteboard, stringForType: autoreleased_nsstring(uti::PLAIN_TEXT)];
            nsstring_to_string(value)
        };
        if let Some(text) = plain.filter(|t| !t.is_empty()) {
            return Ok(text);
        }

        let snapshot = self.snapshot()?;
        if let Some(text) = snapshot.plain_text().filter(|t| !t.is_empty()) {
            return Ok(text);
        }
        if let Some(text) = snapshot.html_text() {
            return Ok(text);
        }

        // RTF は AppKit を優先し、失敗したときだけ簡易変換を使う
        for rep in snapshot.rtf_representations() {
            let text = unsafe {
                let data: id = msg_send![class!(NSData),
                    dataWithBytes: rep.data.as_ptr() as *const std::os::raw::c_void
                    length: rep.data.len() as NSUInteger];
                rtf_via_appkit(data)
            };
            if let Some(text) = text {
                return Ok(text);
            }
        }
        if let Some(text) = snapshot.rtf_text() {
            return Ok(text);
        }
        Ok(String::new())
    }
}

//! ホットキー → キャプチャ → 送信 の一連の流れの統合テスト

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rdev::{EventType, Key};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use clip_capture::application::{
    CaptureEngine, CaptureService, CaptureTimings, DispatchOutcome, Dispatcher, SkipReason,
};
use clip_capture::domain::{CaptureResult, ClipboardSnapshot, HotkeyCombo};
use clip_capture::infrastructure::clipboard::{ClipboardBackend, InMemoryClipboard};
use clip_capture::infrastructure::external::HttpIngestClient;
use clip_capture::shortcut::{ComboDetector, HotkeyEvent, KeyHandler};

use common::{CopiesSelection, NoSelection, RecordingSink};

const TIMINGS: CaptureTimings = CaptureTimings {
    settle_delay: Duration::from_millis(10),
    attempt_timeout: Duration::from_millis(200),
};

async fn wait_until_idle(service: &CaptureService) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while service.is_busy() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!service.is_busy(), "capture session did not finish");
}

#[tokio::test]
async fn test_ctrl_alt_c_captures_draft_text_and_restores_clipboard() {
    let clipboard = Arc::new(InMemoryClipboard::with_snapshot(ClipboardSnapshot::from_text(
        "old clipboard value",
    )));
    let engine = CaptureEngine::new(
        clipboard.clone(),
        vec![Box::new(CopiesSelection::new(&clipboard, "draft text"))],
    );
    let sink = Arc::new(RecordingSink::default());
    let service = CaptureService::new(
        Arc::new(engine),
        Arc::new(Dispatcher::new(sink.clone())),
        TIMINGS,
    );
    let _worker = service.spawn_worker().unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let combo = HotkeyCombo::parse("ctrl+alt+c").unwrap();
    let mut handler = KeyHandler::new(ComboDetector::new(combo, Duration::from_millis(150)), tx);

    let now = Instant::now();
    for key in [Key::ControlLeft, Key::Alt, Key::KeyC] {
        handler.handle_event(&EventType::KeyPress(key), now);
    }
    for key in [Key::KeyC, Key::Alt, Key::ControlLeft] {
        handler.handle_event(&EventType::KeyRelease(key), now);
    }

    assert_eq!(rx.recv().await, Some(HotkeyEvent::Triggered));
    assert!(rx.try_recv().is_err());
    assert!(service.trigger());
    wait_until_idle(&service).await;

    assert_eq!(sink.sent(), vec!["draft text".to_string()]);
    assert_eq!(clipboard.read_text().unwrap(), "old clipboard value");
}

#[tokio::test]
async fn test_held_combo_starts_a_single_session() {
    let clipboard = Arc::new(InMemoryClipboard::new());
    let copy = CopiesSelection::new(&clipboard, "selected");
    let calls = copy.calls.clone();
    let service = Arc::new(CaptureService::new(
        Arc::new(CaptureEngine::new(clipboard.clone(), vec![Box::new(copy)])),
        Arc::new(Dispatcher::new(Arc::new(RecordingSink::default()))),
        TIMINGS,
    ));
    let _worker = service.spawn_worker().unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let combo = HotkeyCombo::parse("cmd+shift+v").unwrap();
    let mut handler = KeyHandler::new(ComboDetector::new(combo, Duration::from_millis(150)), tx);

    // 押しっぱなし（キーリピート）
    let now = Instant::now();
    handler.handle_event(&EventType::KeyPress(Key::MetaLeft), now);
    handler.handle_event(&EventType::KeyPress(Key::ShiftLeft), now);
    for i in 0..10 {
        handler.handle_event(
            &EventType::KeyPress(Key::KeyV),
            now + Duration::from_millis(i * 30),
        );
    }
    drop(handler);

    while let Some(HotkeyEvent::Triggered) = rx.recv().await {
        service.trigger();
    }
    wait_until_idle(&service).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_no_selection_makes_no_network_call() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));
    let counter = connections.clone();
    tokio::spawn(async move {
        while listener.accept().await.is_ok() {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    let clipboard = Arc::new(InMemoryClipboard::new());
    clipboard.write_text("old clipboard value");
    let engine = Arc::new(
        CaptureEngine::new(
            clipboard.clone(),
            vec![
                Box::new(NoSelection("menu")),
                Box::new(NoSelection("script")),
                Box::new(NoSelection("injection")),
            ],
        )
        .with_poll_interval(Duration::from_millis(5)),
    );
    let client =
        HttpIngestClient::with_base_url(&format!("http://{addr}"), Duration::from_secs(2)).unwrap();
    let dispatcher = Dispatcher::new(Arc::new(client));

    let capture_engine = engine.clone();
    let result = tokio::task::spawn_blocking(move || {
        capture_engine.capture(Duration::ZERO, Duration::from_millis(50))
    })
    .await
    .unwrap();
    assert_eq!(result, CaptureResult::unchanged());

    let outcome = dispatcher.send(&result).await;
    assert_eq!(outcome, DispatchOutcome::Skipped(SkipReason::Unchanged));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(connections.load(Ordering::SeqCst), 0);
    assert_eq!(clipboard.read_text().unwrap(), "old clipboard value");
}

use proptest::prelude::*;
use qrsmith::{EncodeError, EncodingSession, Status};
use regex::Regex;

fn assert_consistent(session: &EncodingSession) {
    assert_eq!(
        session.rendered_image().is_some(),
        session.status() == Status::Ready,
        "image must be present exactly when Ready"
    );
}

#[test]
fn url_encodes_to_ready() {
    let mut session = EncodingSession::new();
    session.set_text("https://example.com");
    assert_eq!(session.request_encode().unwrap(), Status::Ready);

    let image = session.rendered_image().expect("image after Ready");
    assert_eq!(image.width(), 300);
    assert!(!image.png().is_empty());
}

#[test]
fn empty_input_leaves_status_alone() {
    let mut session = EncodingSession::new();
    session.set_text("");
    assert_eq!(session.request_encode().unwrap(), Status::Idle);
    assert!(session.rendered_image().is_none());
}

#[test]
fn download_uses_timestamped_name() {
    let tmp = tempfile::tempdir().unwrap();
    let mut session = EncodingSession::new();
    session.set_text("https://example.com");
    session.request_encode().unwrap();

    let path = session.request_download(tmp.path()).unwrap().expect("a file");
    let name = path.file_name().unwrap().to_str().unwrap();
    assert!(Regex::new(r"^qrcode-\d+\.png$").unwrap().is_match(name), "got {}", name);
    assert_eq!(std::fs::read(&path).unwrap(), session.rendered_image().unwrap().png());
}

#[test]
fn clear_after_ready_resets_everything() {
    let mut session = EncodingSession::new();
    session.set_text("https://example.com");
    session.request_encode().unwrap();
    session.clear();

    assert_eq!(session.status(), Status::Idle);
    assert_eq!(session.input_text(), "");
    assert!(session.rendered_image().is_none());
}

#[test]
fn oversized_input_fails() {
    let mut session = EncodingSession::new();
    session.set_text("lorem ipsum dolor sit amet ".repeat(300));
    assert_eq!(session.request_encode().unwrap(), Status::Failed);
    assert!(session.rendered_image().is_none());
    assert!(matches!(session.last_error(), Some(EncodeError::CapacityExceeded(_))));
}

#[test]
fn same_text_gives_identical_png() {
    let mut a = EncodingSession::new();
    let mut b = EncodingSession::new();
    for session in [&mut a, &mut b] {
        session.set_text("determinism check");
        session.request_encode().unwrap();
    }
    assert_eq!(
        a.rendered_image().unwrap().png(),
        b.rendered_image().unwrap().png()
    );
}

#[derive(Debug, Clone)]
enum Action {
    SetText(String),
    Encode,
    Clear,
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        3 => prop_oneof![
            Just(String::new()),
            Just("   ".to_string()),
            "[a-zA-Z0-9 ]{1,40}",
            Just("x".repeat(3000)),
        ]
        .prop_map(Action::SetText),
        2 => Just(Action::Encode),
        1 => Just(Action::Clear),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn image_present_iff_ready(actions in prop::collection::vec(action(), 0..12)) {
        let mut session = EncodingSession::new();
        assert_consistent(&session);
        for action in actions {
            let before = session.status();
            match action {
                Action::SetText(text) => {
                    session.set_text(text);
                    prop_assert_eq!(session.status(), before);
                }
                Action::Encode => {
                    let blank = session.input_text().trim().is_empty();
                    let after = session.request_encode().unwrap();
                    if blank {
                        prop_assert_eq!(after, before);
                    } else {
                        prop_assert!(matches!(after, Status::Ready | Status::Failed));
                    }
                }
                Action::Clear => session.clear(),
            }
            assert_consistent(&session);
        }
    }

    #[test]
    fn clear_is_idempotent(text in "[a-z]{0,20}", encode in any::<bool>(), times in 1usize..5) {
        let mut session = EncodingSession::new();
        session.set_text(text);
        if encode {
            session.request_encode().unwrap();
        }
        for _ in 0..times {
            session.clear();
            prop_assert_eq!(session.status(), Status::Idle);
            prop_assert_eq!(session.input_text(), "");
            prop_assert!(session.rendered_image().is_none());
            prop_assert!(session.last_error().is_none());
        }
    }
}

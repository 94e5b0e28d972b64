//! The three mouse dialects decode to the same event shape.

use spark_term::program::{Capture, Program, ProgramOptions, StaticHost};
use spark_term::{Event, MouseAction, MouseButton, MouseEvent};

fn program() -> Program {
    Program::new(
        Capture::new(),
        &StaticHost::new(),
        ProgramOptions::default().term("xterm-256color").buffered(false).size(80, 24),
    )
}

fn mouse(events: Vec<Event>) -> Vec<MouseEvent> {
    events
        .into_iter()
        .filter_map(|e| match e {
            Event::Mouse(m) => Some(m),
            _ => None,
        })
        .collect()
}

fn summary(m: &MouseEvent) -> (MouseAction, MouseButton, u16, u16) {
    (m.action, m.button, m.x, m.y)
}

#[test]
fn x10_urxvt_and_sgr_agree() {
    let expected = (MouseAction::MouseDown, MouseButton::Left, 9, 4);
    let inputs: [&[u8]; 3] = [b"\x1b[M\x20\x2a\x25", b"\x1b[32;10;5M", b"\x1b[<0;10;5M"];
    for input in inputs {
        let got = mouse(program().feed(input));
        assert_eq!(got.len(), 1, "input {input:?}");
        assert_eq!(summary(&got[0]), expected, "input {input:?}");
    }
}

#[test]
fn sgr_release_is_lowercase() {
    let got = mouse(program().feed(b"\x1b[<0;10;5M\x1b[<0;10;5m"));
    let actions: Vec<_> = got.iter().map(|m| m.action).collect();
    assert_eq!(actions, vec![MouseAction::MouseDown, MouseAction::MouseUp]);
}

#[test]
fn legacy_release_reports_last_button() {
    let got = mouse(program().feed(b"\x1b[M\x22\x21\x21\x1b[M\x23\x21\x21"));
    assert_eq!(summary(&got[0]), (MouseAction::MouseDown, MouseButton::Right, 0, 0));
    assert_eq!(summary(&got[1]), (MouseAction::MouseUp, MouseButton::Right, 0, 0));
}

#[test]
fn wheel_and_modifiers() {
    let got = mouse(program().feed(b"\x1b[<64;3;3M\x1b[<65;3;3M\x1b[<20;1;1M"));
    assert_eq!(got[0].action, MouseAction::WheelUp);
    assert_eq!(got[1].action, MouseAction::WheelDown);
    assert!(got[2].shift && got[2].ctrl && !got[2].meta);
}

#[test]
fn chunked_delivery_is_reassembled() {
    let mut p = program();
    assert!(mouse(p.feed(b"\x1b[<0;1")).is_empty());
    let got = mouse(p.feed(b"0;5M"));
    assert_eq!(summary(&got[0]), (MouseAction::MouseDown, MouseButton::Left, 9, 4));
}

//! End-to-end render through the screen into a captured terminal.

use spark_term::program::{Capture, Program, ProgramOptions, StaticHost};
use spark_term::{Attr, Border, Cell, Element, Screen, ScreenOptions};

fn screen(options: ScreenOptions) -> (Screen, Capture) {
    let cap = Capture::new();
    let program = Program::new(
        cap.clone(),
        &StaticHost::new(),
        ProgramOptions::default().term("xterm-256color").buffered(false).size(80, 24),
    );
    (Screen::new(program, options), cap)
}

fn boxed(left: i32, top: i32, width: i32, height: i32) -> Element {
    Element::new().left(left).top(top).width(width).height(height).border(Border::line())
}

#[test]
fn bordered_box_with_text() {
    let (mut s, cap) = screen(ScreenOptions::default());
    s.append(None, boxed(1, 1, 10, 5).content("Hi")).unwrap();
    s.render();

    assert_eq!(s.grid().get(2, 2), Some(&Cell::new(Attr::DEFAULT, "H")));
    assert_eq!(s.grid().get(3, 2).map(|c| c.ch.as_str()), Some("i"));
    assert_eq!(s.grid().get(1, 1).map(|c| c.ch.as_str()), Some("┌"));
    assert_eq!(s.grid().get(10, 5).map(|c| c.ch.as_str()), Some("┘"));

    let out = cap.take();
    assert!(out.starts_with("\x1b7\x1b[?25l"));
    assert!(out.contains("Hi"));
    assert!(out.ends_with("\x1b8\x1b[?25h"));
}

#[test]
fn unchanged_frame_emits_nothing() {
    let (mut s, cap) = screen(ScreenOptions::default());
    s.append(None, boxed(1, 1, 10, 5).content("Hi")).unwrap();
    s.render();
    cap.take();
    s.render();
    assert_eq!(cap.take(), "");
}

#[test]
fn content_change_redraws_only_that_run() {
    let (mut s, cap) = screen(ScreenOptions::default());
    let id = s.append(None, boxed(1, 1, 10, 5).content("Hi")).unwrap();
    s.render();
    cap.take();
    s.get_mut(id).unwrap().content = "Ho".to_string();
    s.render();
    assert_eq!(cap.take(), "\x1b7\x1b[?25l\x1b[3;1H\x1b[3Co\x1b8\x1b[?25h");
}

#[test]
fn docked_borders_join() {
    let (mut s, _) = screen(ScreenOptions::default().dock_borders(true));
    s.append(None, boxed(0, 0, 3, 3)).unwrap();
    s.append(None, boxed(2, 0, 3, 3)).unwrap();
    s.render();
    let top: String = (0..5).filter_map(|x| s.grid().get(x, 0)).map(|c| c.ch.as_str()).collect();
    let bottom: String = (0..5).filter_map(|x| s.grid().get(x, 2)).map(|c| c.ch.as_str()).collect();
    assert_eq!(top, "┌─┬─┐");
    assert_eq!(bottom, "└─┴─┘");
}

#[test]
fn hidden_elements_are_not_drawn() {
    let (mut s, _) = screen(ScreenOptions::default());
    s.append(None, boxed(0, 0, 4, 3).hidden(true)).unwrap();
    s.render();
    assert_eq!(s.grid().get(0, 0).map(|c| c.ch.as_str()), Some(" "));
}

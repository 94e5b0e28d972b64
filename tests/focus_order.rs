//! Tab order and focus cycling through the screen.

use std::cell::RefCell;
use std::rc::Rc;

use spark_term::program::{Capture, Program, ProgramOptions, StaticHost};
use spark_term::{Element, FocusEvent, Screen, ScreenOptions};

fn screen() -> Screen {
    let program = Program::new(
        Capture::new(),
        &StaticHost::new(),
        ProgramOptions::default().term("xterm").buffered(false).size(40, 10),
    );
    Screen::new(program, ScreenOptions::default())
}

#[test]
fn positive_indices_come_first() {
    let mut s = screen();
    let three = s.append(None, Element::new().tab_index(3)).unwrap();
    let one = s.append(None, Element::new().tab_index(1)).unwrap();
    let natural = s.append(None, Element::new().focusable(true)).unwrap();
    let later = s.append(None, Element::new().focusable(true)).unwrap();
    assert_eq!(s.tab_order(), vec![one, three, natural, later]);

    s.focus_next();
    assert_eq!(s.focused(), Some(one));
    s.focus_next();
    assert_eq!(s.focused(), Some(three));
    s.focus_next();
    assert_eq!(s.focused(), Some(natural));
}

#[test]
fn single_widget_toggles_through_rest_state() {
    let mut s = screen();
    let only = s.append(None, Element::new().focusable(true)).unwrap();
    s.focus(only);
    assert_eq!(s.focused(), Some(only));
    s.focus_next();
    assert_eq!(s.focused(), None);
    s.focus_next();
    assert_eq!(s.focused(), Some(only));
}

#[test]
fn previous_from_rest_lands_on_last() {
    let mut s = screen();
    let a = s.append(None, Element::new().focusable(true)).unwrap();
    let b = s.append(None, Element::new().focusable(true)).unwrap();
    s.focus_previous();
    assert_eq!(s.focused(), Some(b));
    s.focus_previous();
    assert_eq!(s.focused(), Some(a));
    // Landing back on the focused element leaves nothing focused.
    s.focus_offset(-2);
    assert_eq!(s.focused(), None);
    assert_eq!(s.focus_history().entries(), &[b, a]);
}

#[test]
fn rest_state_ignores_older_history() {
    let mut s = screen();
    let only = s.append(None, Element::new().focusable(true)).unwrap();
    let offstage = s.append(None, Element::new().tab_index(-1)).unwrap();
    let blurs = Rc::new(RefCell::new(Vec::new()));
    for id in [only, offstage] {
        let blurs = blurs.clone();
        s.on_focus(id, move |ev, _| blurs.borrow_mut().push((id, ev)));
    }
    s.focus(offstage);
    s.focus(only);
    blurs.borrow_mut().clear();

    s.focus_next();
    assert_eq!(s.focused(), None);
    assert_eq!(*blurs.borrow(), vec![(only, FocusEvent::Blur { next: None })]);

    s.focus_next();
    assert_eq!(s.focused(), Some(only));
    assert_eq!(s.focus_history().entries(), &[offstage, only]);
}

#[test]
fn save_and_restore() {
    let mut s = screen();
    let a = s.append(None, Element::new().focusable(true)).unwrap();
    let b = s.append(None, Element::new().focusable(true)).unwrap();
    s.focus(a);
    s.save_focus();
    s.focus(b);
    assert_eq!(s.restore_focus(), Some(a));
}

#[test]
fn rewind_skips_detached() {
    let mut s = screen();
    let a = s.append(None, Element::new().focusable(true)).unwrap();
    let b = s.append(None, Element::new().focusable(true)).unwrap();
    let c = s.append(None, Element::new().focusable(true)).unwrap();
    s.focus(a);
    s.focus(b);
    s.focus(c);
    s.tree_mut().detach(b);
    assert_eq!(s.rewind_focus(), Some(a));
}

//! The screen: element tree, cell grids, focus, and the render loop.
//!
//! A [`Screen`] owns a [`Program`] and everything above it. Callers mutate
//! elements, then call [`Screen::render`]; input goes the other way through
//! [`Screen::dispatch`] (or [`Screen::poll`], which reads from the
//! program first).
//!
//! # Example
//!
//! ```no_run
//! use spark_term::element::{Border, Element};
//! use spark_term::program::ProgramOptions;
//! use spark_term::screen::{Screen, ScreenOptions};
//!
//! let mut screen = Screen::with_stdio(ProgramOptions::default(), ScreenOptions::default())?;
//! screen.enter();
//! let hello = Element::new().left(1).top(1).width(10).height(5).border(Border::line()).content("Hi");
//! screen.append(None, hello)?;
//! screen.render();
//! # Ok::<(), spark_term::Error>(())
//! ```

pub mod batch;
pub mod cursor;
pub mod draw;
pub mod focus;
pub mod grid;
pub mod junction;
pub mod listeners;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

pub use self::cursor::ArtificialCursor;
pub use self::draw::DrawOptions;
pub use self::focus::{FocusChange, FocusHistory};
pub use self::grid::Grid;
pub use self::listeners::{Command, Commands, FocusEvent};

use self::batch::{Batch, Task};
use self::draw::CursorOverlay;
use self::listeners::{EventListener, FocusListener, KeyListener, MouseListener};
use crate::element::content::TextOptions;
use crate::element::render::Compositor;
use crate::element::scroll::{LINE_SCROLL, WHEEL_SCROLL};
use crate::element::{Element, ElementId, Layout, ScrollState, Tree};
use crate::error::{Error, Result};
use crate::program::{Cap, CursorShape, Event, KeyEvent, MouseAction, MouseEvent, Program, ProgramOptions};
use crate::scheduler::{Scheduler, TimerId};

/// Command rounds applied per dispatch before the rest is dropped.
const MAX_COMMAND_ROUNDS: usize = 32;

// =============================================================================
// Options
// =============================================================================

/// Screen configuration.
#[derive(Debug, Clone)]
pub struct ScreenOptions {
    /// Join touching line borders with tee and cross glyphs.
    pub dock_borders: bool,
    /// Join borders even when their attributes differ.
    pub ignore_dock_contrast: bool,
    /// Offset children by their parent's border and padding.
    pub auto_padding: bool,
    /// Erase trailing blank runs with `EL`.
    pub use_bce: bool,
    /// Render double-width glyphs; otherwise they become `?`.
    pub full_unicode: bool,
    /// Upper bound for [`Screen::render_throttled`].
    pub max_fps: u32,
    pub tab_size: usize,
    /// Scroll elements with clean sides through scroll regions.
    pub smart_csr: bool,
    /// Tab / Shift-Tab move focus.
    pub tab_navigation: bool,
    /// Paint the cursor into the grid instead of using the terminal's.
    pub artificial_cursor: Option<ArtificialCursor>,
    pub title: Option<String>,
}

impl Default for ScreenOptions {
    fn default() -> Self {
        Self {
            dock_borders: false,
            ignore_dock_contrast: false,
            auto_padding: true,
            use_bce: false,
            full_unicode: true,
            max_fps: 60,
            tab_size: 4,
            smart_csr: false,
            tab_navigation: true,
            artificial_cursor: None,
            title: None,
        }
    }
}

impl ScreenOptions {
    pub fn dock_borders(mut self, on: bool) -> Self {
        self.dock_borders = on;
        self
    }

    pub fn ignore_dock_contrast(mut self, on: bool) -> Self {
        self.ignore_dock_contrast = on;
        self
    }

    pub fn auto_padding(mut self, on: bool) -> Self {
        self.auto_padding = on;
        self
    }

    pub fn use_bce(mut self, on: bool) -> Self {
        self.use_bce = on;
        self
    }

    pub fn full_unicode(mut self, on: bool) -> Self {
        self.full_unicode = on;
        self
    }

    pub fn max_fps(mut self, fps: u32) -> Self {
        self.max_fps = fps;
        self
    }

    pub fn tab_size(mut self, size: usize) -> Self {
        self.tab_size = size;
        self
    }

    pub fn smart_csr(mut self, on: bool) -> Self {
        self.smart_csr = on;
        self
    }

    pub fn tab_navigation(mut self, on: bool) -> Self {
        self.tab_navigation = on;
        self
    }

    pub fn artificial_cursor(mut self, cursor: ArtificialCursor) -> Self {
        self.artificial_cursor = Some(cursor);
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    fn text(&self) -> TextOptions {
        TextOptions { full_unicode: self.full_unicode, tab_size: self.tab_size }
    }

    fn frame_interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.max_fps.max(1)))
    }
}

// =============================================================================
// Screen
// =============================================================================

pub struct Screen {
    program: Program,
    options: ScreenOptions,
    grid: Grid,
    tree: Tree,
    focus: FocusHistory,
    lock_keys: bool,

    batch: Batch,
    timers: Scheduler<Task>,
    throttle: Option<TimerId>,
    blink: Option<TimerId>,
    cursor_row: Option<usize>,
    renders: u64,

    listeners: Vec<EventListener>,
    key_listeners: HashMap<ElementId, Vec<KeyListener>>,
    mouse_listeners: HashMap<ElementId, Vec<MouseListener>>,
    focus_listeners: HashMap<ElementId, Vec<FocusListener>>,
    commands: Commands,
    in_commands: bool,

    destroyed: bool,
}

impl Screen {
    pub fn new(mut program: Program, options: ScreenOptions) -> Self {
        let grid = Grid::new(program.cols(), program.rows());
        if let Some(title) = &options.title {
            program.set_title(title);
        }
        let mut screen = Self {
            program,
            options,
            grid,
            tree: Tree::new(),
            focus: FocusHistory::new(),
            lock_keys: false,
            batch: Batch::default(),
            timers: Scheduler::new(),
            throttle: None,
            blink: None,
            cursor_row: None,
            renders: 0,
            listeners: Vec::new(),
            key_listeners: HashMap::new(),
            mouse_listeners: HashMap::new(),
            focus_listeners: HashMap::new(),
            commands: Commands::new(),
            in_commands: false,
            destroyed: false,
        };
        screen.schedule_blink(Instant::now());
        screen
    }

    /// Screen on the real terminal.
    pub fn with_stdio(program: ProgramOptions, options: ScreenOptions) -> Result<Self> {
        Ok(Self::new(Program::with_stdio(program)?, options))
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn program_mut(&mut self) -> &mut Program {
        &mut self.program
    }

    pub fn options(&self) -> &ScreenOptions {
        &self.options
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn cols(&self) -> u16 {
        self.program.cols()
    }

    pub fn rows(&self) -> u16 {
        self.program.rows()
    }

    /// Number of completed renders.
    pub fn renders(&self) -> u64 {
        self.renders
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Take over the terminal: alternate buffer, hidden cursor, full
    /// scroll region, blank grids.
    pub fn enter(&mut self) {
        let rows = self.program.rows();
        self.program.alt_buffer(true);
        self.program.hide_cursor();
        self.program.csr(0, rows - 1);
        self.program.clear();
        self.grid.alloc(self.program.cols(), rows, true);
    }

    /// Restore the terminal and release the program. Safe to call twice.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        if let Some(t) = self.throttle.take() {
            self.timers.cancel(t);
        }
        if let Some(t) = self.blink.take() {
            self.timers.cancel(t);
        }
        self.program.destroy();
        debug!("screen destroyed");
    }

    // =========================================================================
    // Elements
    // =========================================================================

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.tree.get(id)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.tree.get_mut(id)
    }

    /// Add `el` under `parent` (`None` = the screen itself).
    pub fn append(&mut self, parent: Option<ElementId>, el: Element) -> Result<ElementId> {
        if let Some(p) = parent {
            if !self.tree.contains(p) {
                return Err(Error::UnknownElement(p));
            }
        }
        let id = self.tree.insert(el);
        self.tree.append(parent, id)?;
        Ok(id)
    }

    /// Move an existing element under `parent`.
    pub fn attach(&mut self, parent: Option<ElementId>, id: ElementId) -> Result<()> {
        self.tree.append(parent, id)
    }

    /// Unlink an element; it keeps its state and can be attached again.
    pub fn detach(&mut self, id: ElementId) {
        self.tree.detach(id);
        for d in self.tree.subtree(id) {
            self.remove_from_history(d);
        }
    }

    /// Delete an element, its subtree, and their listeners.
    pub fn remove(&mut self, id: ElementId) {
        for d in self.tree.remove(id) {
            self.key_listeners.remove(&d);
            self.mouse_listeners.remove(&d);
            self.remove_from_history(d);
            self.focus_listeners.remove(&d);
        }
    }

    /// Resolver over the current tree and size.
    pub fn layout(&self) -> Layout<'_> {
        Layout::new(&self.tree, self.program.cols(), self.program.rows())
            .auto_padding(self.options.auto_padding)
            .text(self.options.text())
            .renders(self.renders)
    }

    /// Topmost rendered element covering `(x, y)`.
    pub fn element_at(&self, x: i32, y: i32) -> Option<ElementId> {
        self.topmost(x, y, |_| true)
    }

    fn topmost(&self, x: i32, y: i32, accept: impl Fn(ElementId) -> bool) -> Option<ElementId> {
        self.tree
            .walk()
            .into_iter()
            .filter(|id| accept(*id))
            .filter_map(|id| {
                let el = self.tree.get(id)?;
                let pos = el.last_coords()?;
                pos.contains(x, y).then_some((el.z_index()?, id))
            })
            .max_by_key(|(z, _)| *z)
            .map(|(_, id)| id)
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Composite every element and draw the difference.
    pub fn render(&mut self) {
        if self.destroyed {
            return;
        }
        self.renders += 1;
        self.grid.clear();

        let stops = {
            let mut comp = Compositor::new(&mut self.tree, &mut self.grid)
                .auto_padding(self.options.auto_padding)
                .text(self.options.text())
                .renders(self.renders)
                .focused(self.focus.focused());
            comp.render_all();
            comp.border_stops().clone()
        };
        if self.options.dock_borders {
            junction::dock_borders(&mut self.grid, &stops, self.options.ignore_dock_contrast);
        }

        let last = self.grid.rows().saturating_sub(1);
        let bytes = self.draw(0, last);
        trace!(renders = self.renders, bytes, "render");
    }

    /// Emit pending changes for rows `start..=end`. Returns the byte count.
    pub fn draw(&mut self, start: usize, end: usize) -> usize {
        let caps = self.program.caps();
        let opts = DrawOptions {
            colors: caps.colors,
            parm_right_cursor: caps.has(Cap::ParmRightCursor),
            bce: caps.has(Cap::BackColorErase),
            use_bce: self.options.use_bce,
            cursor_hidden: self.program.cursor_hidden(),
            unicode: caps.has(Cap::Unicode),
        };

        if let Some(row) = self.cursor_row.take() {
            self.grid.mark_dirty(row);
        }
        let (cx, cy) = self.program.cursor();
        let overlay = self.options.artificial_cursor.as_ref().map(|cursor| CursorOverlay {
            x: cx as usize,
            y: cy as usize,
            cursor,
        });
        if overlay.is_some_and(|o| o.cursor.is_drawn()) {
            self.cursor_row = Some(cy as usize);
        }

        let bytes = draw::draw(&mut self.grid, &opts, overlay, start, end);
        if !bytes.is_empty() {
            self.program.emit(&bytes);
        }
        bytes.len()
    }

    /// Render now, or at the end of the current batch.
    pub fn request_render(&mut self) {
        if self.batch.request() {
            self.render();
        }
    }

    pub fn begin_batch(&mut self) {
        self.batch.begin();
    }

    /// Close one batch level; the outermost runs a requested render.
    pub fn end_batch(&mut self) {
        if self.batch.end() {
            self.render();
        }
    }

    /// Schedule a render at most once per frame interval.
    pub fn render_throttled(&mut self, now: Instant) {
        if self.throttle.is_some_and(|t| self.timers.is_pending(t)) {
            return;
        }
        let interval = self.options.frame_interval();
        self.throttle = Some(self.timers.after(now, interval, Task::Render));
    }

    /// Drop a scheduled throttled render. Returns whether one was pending.
    pub fn cancel_throttled_render(&mut self) -> bool {
        match self.throttle.take() {
            Some(t) => self.timers.cancel(t),
            None => false,
        }
    }

    pub fn has_throttled_render(&self) -> bool {
        self.throttle.is_some_and(|t| self.timers.is_pending(t))
    }

    /// Run due timers and flush buffered output.
    pub fn tick(&mut self, now: Instant) {
        for task in self.timers.due(now) {
            match task {
                Task::Render => {
                    self.throttle = None;
                    self.render();
                }
                Task::CursorBlink => {
                    if let Some(c) = self.options.artificial_cursor.as_mut() {
                        c.toggle();
                        if self.renders > 0 {
                            self.render();
                        }
                    }
                }
            }
        }
        self.program.tick();
    }

    /// Earliest timer deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Whether a timer should keep an event loop running.
    pub fn has_pending_work(&self) -> bool {
        self.timers.keeps_alive()
    }

    /// Wait for input up to `timeout` (or the next timer), dispatch it, and
    /// run due timers. Returns the dispatched events.
    pub fn poll(&mut self, timeout: Duration) -> Vec<Event> {
        let now = Instant::now();
        let wait = match self.timers.next_deadline() {
            Some(d) => timeout.min(d.saturating_duration_since(now)),
            None => timeout,
        };
        let events = self.program.poll(wait);
        for ev in &events {
            self.dispatch(ev);
        }
        self.tick(Instant::now());
        events
    }

    /// Parse `bytes` as terminal input and dispatch the result.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Event> {
        let events = self.program.feed(bytes);
        for ev in &events {
            self.dispatch(ev);
        }
        events
    }

    /// Record a new terminal size, reallocate both grids, and re-render.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        let ev = self.program.resize(cols, rows);
        self.dispatch(&ev);
    }

    fn apply_resize(&mut self) {
        self.grid.alloc(self.program.cols(), self.program.rows(), true);
        debug!(cols = self.program.cols(), rows = self.program.rows(), "resize");
        if self.renders > 0 {
            self.request_render();
        }
    }

    // =========================================================================
    // Cursor
    // =========================================================================

    fn schedule_blink(&mut self, now: Instant) {
        if let Some(t) = self.blink.take() {
            self.timers.cancel(t);
        }
        if self.options.artificial_cursor.as_ref().is_some_and(|c| c.blink) {
            let id = self.timers.every(now, cursor::BLINK_INTERVAL, Task::CursorBlink);
            self.timers.unref(id);
            self.blink = Some(id);
        }
    }

    /// Change the cursor shape: painted when artificial, requested from
    /// the terminal otherwise.
    pub fn cursor_shape(&mut self, shape: CursorShape, blink: bool) {
        match self.options.artificial_cursor.as_mut() {
            Some(c) => {
                c.shape = shape;
                c.blink = blink;
                c.phase = true;
                self.schedule_blink(Instant::now());
            }
            None => self.program.cursor_shape(shape, blink),
        }
    }

    pub fn hide_cursor(&mut self) {
        match self.options.artificial_cursor.as_mut() {
            Some(c) => c.hidden = true,
            None => self.program.hide_cursor(),
        }
    }

    pub fn show_cursor(&mut self) {
        match self.options.artificial_cursor.as_mut() {
            Some(c) => c.hidden = false,
            None => self.program.show_cursor(),
        }
    }

    // =========================================================================
    // Smart CSR
    // =========================================================================

    /// Insert `n` blank rows at `y` inside the region `top..=bottom`, on the
    /// terminal and in both grids.
    pub fn insert_line(&mut self, n: usize, y: usize, top: usize, bottom: usize) {
        if !self.program.has(Cap::ChangeScrollRegion) || top > bottom {
            return;
        }
        let y = y.clamp(top, bottom);
        self.region_op(top, bottom, y, |p| p.insert_lines(n as u16));
        self.grid.insert_lines(n, y, bottom);
    }

    /// Delete `n` rows at `y` inside the region `top..=bottom`, on the
    /// terminal and in both grids.
    pub fn delete_line(&mut self, n: usize, y: usize, top: usize, bottom: usize) {
        if !self.program.has(Cap::ChangeScrollRegion) || top > bottom {
            return;
        }
        let y = y.clamp(top, bottom);
        self.region_op(top, bottom, y, |p| p.delete_lines(n as u16));
        self.grid.delete_lines(n, y, bottom);
    }

    fn region_op(&mut self, top: usize, bottom: usize, y: usize, op: impl FnOnce(&mut Program)) {
        let rows = self.program.rows();
        self.program.save_cursor();
        self.program.csr(top as u16, bottom as u16);
        self.program.cup(0, y as i32);
        op(&mut self.program);
        self.program.csr(0, rows - 1);
        self.program.restore_cursor();
    }

    /// Whether the columns on both sides of the element are uniform over
    /// its interior rows, so scrolling the whole row band is invisible
    /// outside it.
    pub fn clean_sides(&self, id: ElementId) -> bool {
        let Some(el) = self.tree.get(id) else { return false };
        let Some(pos) = el.last_coords() else { return false };
        let cols = self.grid.cols() as i32;
        let rows = self.grid.rows() as i32;

        if pos.xi <= 0 && pos.xl >= cols {
            return true;
        }
        if !self.options.smart_csr {
            return false;
        }
        if pos.yi < 0 || pos.yl > rows {
            return false;
        }
        if pos.xi - 1 < 0 || pos.xl > cols {
            return true;
        }

        let yi = pos.yi + el.itop();
        let yl = pos.yl - el.ibottom();
        let uniform = |x: i32| {
            let Some(first) = self.grid.committed(x, yi) else { return true };
            (yi..yl).all(|y| self.grid.committed(x, y).is_none_or(|c| c == first))
        };
        (0..pos.xi).all(uniform) && (pos.xl..cols).all(uniform)
    }

    // =========================================================================
    // Scrolling
    // =========================================================================

    fn scroll_with(&mut self, id: ElementId, f: impl FnOnce(&mut ScrollState, i32, i32) -> bool) -> bool {
        if !self.tree.get(id).is_some_and(|e| e.is_attached() && e.is_scrollable()) {
            return false;
        }
        let (visible, height) = {
            let layout = self.layout();
            (layout.view_height(id), layout.scroll_height(id))
        };
        let Some(state) = self.tree.get_mut(id).and_then(|e| e.scroll.as_mut()) else { return false };
        let base = state.child_base;
        let changed = f(state, visible, height);
        let delta = state.child_base - base;
        if changed {
            self.scroll_region(id, delta, visible);
        }
        changed
    }

    /// Shift the rows on screen to match a scroll of `delta` rows.
    fn scroll_region(&mut self, id: ElementId, delta: i32, visible: i32) {
        if delta == 0 || !self.clean_sides(id) {
            return;
        }
        let Some(el) = self.tree.get(id) else { return };
        let Some(pos) = el.last_coords() else { return };
        let top = pos.yi + el.itop();
        let bottom = pos.yl - el.ibottom() - 1;
        if top < 0 || bottom < top {
            return;
        }
        let (top, bottom) = (top as usize, bottom as usize);
        if delta > 0 && delta < visible {
            self.delete_line(delta as usize, top, top, bottom);
        } else if delta < 0 && -delta < visible {
            self.insert_line((-delta) as usize, top, top, bottom);
        }
    }

    /// Scroll by `offset` rows. Returns whether the view moved.
    pub fn scroll(&mut self, id: ElementId, offset: i32) -> bool {
        self.scroll_with(id, |s, visible, height| s.scroll(offset, false, visible, height))
    }

    /// Bring content row `row` into view.
    pub fn scroll_to(&mut self, id: ElementId, row: i32) -> bool {
        self.scroll_with(id, |s, visible, height| s.scroll_to(row, false, visible, height))
    }

    pub fn set_scroll_perc(&mut self, id: ElementId, perc: f32) -> bool {
        self.scroll_with(id, |s, visible, height| s.set_perc(perc, visible, height))
    }

    pub fn reset_scroll(&mut self, id: ElementId) -> bool {
        self.scroll_with(id, |s, _, _| {
            let moved = s.child_base != 0;
            s.reset();
            moved
        })
    }

    pub fn scroll_height(&self, id: ElementId) -> i32 {
        self.layout().scroll_height(id)
    }

    /// Scroll position in percent, `None` when the content fits.
    pub fn scroll_perc(&self, id: ElementId) -> Option<f32> {
        let state = self.tree.get(id)?.scroll?;
        let layout = self.layout();
        state.perc(layout.view_height(id), layout.scroll_height(id))
    }

    // =========================================================================
    // Focus
    // =========================================================================

    pub fn focused(&self) -> Option<ElementId> {
        self.focus.focused()
    }

    pub fn focus_history(&self) -> &FocusHistory {
        &self.focus
    }

    /// Focusable elements in tab order.
    pub fn tab_order(&self) -> Vec<ElementId> {
        focus::tab_order(&self.tree)
    }

    /// Focus `id`. No-op when it is already focused.
    pub fn focus(&mut self, id: ElementId) -> bool {
        if !self.tree.contains(id) {
            return false;
        }
        if self.focused() != Some(id) {
            let change = self.focus.push(id);
            self.apply_focus(change);
        }
        true
    }

    /// Push `id` onto the focus history even when it is already on top.
    pub fn focus_push(&mut self, id: ElementId) {
        if self.tree.contains(id) {
            let change = self.focus.push(id);
            self.apply_focus(change);
        }
    }

    /// Drop the focused element, refocusing the previous one.
    pub fn focus_pop(&mut self) -> Option<ElementId> {
        let change = self.focus.pop();
        self.apply_focus(change);
        change.blurred
    }

    pub fn save_focus(&mut self) {
        self.focus.save();
    }

    /// Refocus the element saved by [`save_focus`](Self::save_focus).
    pub fn restore_focus(&mut self) -> Option<ElementId> {
        let saved = self.focus.take_saved()?;
        self.focus(saved);
        self.focused()
    }

    /// Pop focus until an attached, visible element is on top.
    pub fn rewind_focus(&mut self) -> Option<ElementId> {
        let tree = &self.tree;
        let change = self.focus.rewind(|id| tree.is_visible(id));
        self.apply_focus(change);
        change.focused
    }

    /// Forget `id` in the focus history.
    pub fn remove_from_history(&mut self, id: ElementId) {
        let change = self.focus.remove(id);
        self.apply_focus(change);
    }

    /// Move focus `offset` places through the tab order. Landing on the
    /// focused element leaves nothing focused; the history is kept.
    pub fn focus_offset(&mut self, offset: i32) {
        let order = self.tab_order();
        let current = self.focused();
        match focus::offset_target(&order, current, offset) {
            Some(target) if Some(target) == current => {
                let change = self.focus.clear();
                self.apply_focus(change);
            }
            Some(target) => {
                self.focus(target);
            }
            None => {}
        }
    }

    pub fn focus_next(&mut self) {
        self.focus_offset(1);
    }

    pub fn focus_previous(&mut self) {
        self.focus_offset(-1);
    }

    pub fn blur(&mut self) {
        if self.focused().is_some() {
            self.rewind_focus();
        }
    }

    fn apply_focus(&mut self, change: FocusChange) {
        if change.is_empty() || change.blurred == change.focused {
            return;
        }
        if let Some(id) = change.focused {
            self.scroll_into_view(id);
        }
        if let Some(old) = change.blurred {
            self.fire_focus(old, FocusEvent::Blur { next: change.focused });
        }
        if let Some(new) = change.focused {
            self.fire_focus(new, FocusEvent::Focus { previous: change.blurred });
        }
        self.run_commands();
    }

    /// Scroll the nearest scrollable ancestor so `id` is visible.
    fn scroll_into_view(&mut self, id: ElementId) {
        let Some(anc) = self.tree.scrollable_ancestor(id) else { return };
        if !self.tree.get(anc).is_some_and(Element::is_attached) {
            return;
        }
        let target = {
            let layout = self.layout();
            let (Some(cur), Some(parent)) = (layout.coords_unscrolled(id), layout.coords_unscrolled(anc)) else {
                return;
            };
            let (Some(el), Some(ae), Some(state)) =
                (self.tree.get(id), self.tree.get(anc), self.tree.get(anc).and_then(|a| a.scroll))
            else {
                return;
            };
            let visible = layout.view_height(anc);
            let rtop = cur.yi - parent.yi;
            let height = cur.height();
            if rtop < state.child_base {
                Some((rtop, false))
            } else if rtop + height - el.ibottom() > state.child_base + visible {
                Some((rtop - (parent.height() - height) + ae.itop(), true))
            } else {
                None
            }
        };
        if let Some((row, always)) = target {
            self.scroll_with(anc, |s, visible, h| s.scroll_to(row, always, visible, h));
            self.commands.render();
        }
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Listen to every event before elements see it.
    pub fn on_event(&mut self, f: impl FnMut(&Event, &mut Commands) + 'static) {
        self.listeners.push(Box::new(f));
    }

    /// Keys delivered while `id` is focused.
    pub fn on_key(&mut self, id: ElementId, f: impl FnMut(&KeyEvent, &mut Commands) + 'static) {
        self.key_listeners.entry(id).or_default().push(Box::new(f));
    }

    /// Mouse events whose point hits `id` on top.
    pub fn on_mouse(&mut self, id: ElementId, f: impl FnMut(&MouseEvent, &mut Commands) + 'static) {
        self.mouse_listeners.entry(id).or_default().push(Box::new(f));
    }

    pub fn on_focus(&mut self, id: ElementId, f: impl FnMut(FocusEvent, &mut Commands) + 'static) {
        self.focus_listeners.entry(id).or_default().push(Box::new(f));
    }

    pub fn keys_locked(&self) -> bool {
        self.lock_keys
    }

    /// Stop delivering keys to elements; screen listeners still run.
    pub fn lock_keys(&mut self, on: bool) {
        self.lock_keys = on;
    }

    fn fire_focus(&mut self, id: ElementId, ev: FocusEvent) {
        let Some(mut ls) = self.focus_listeners.remove(&id) else { return };
        let mut cmds = Commands::new();
        for l in &mut ls {
            l(ev, &mut cmds);
        }
        self.focus_listeners.insert(id, ls);
        self.commands.append(&mut cmds);
    }

    /// Apply queued listener commands. Commands queued while applying run
    /// in later rounds of the same call.
    fn run_commands(&mut self) {
        if self.in_commands {
            return;
        }
        self.in_commands = true;
        let mut render = false;
        for _ in 0..MAX_COMMAND_ROUNDS {
            if self.commands.is_empty() {
                break;
            }
            let batch: Vec<Command> = self.commands.drain().collect();
            for cmd in batch {
                match cmd {
                    Command::Focus(id) => {
                        self.focus(id);
                    }
                    Command::Blur => self.blur(),
                    Command::FocusNext => self.focus_next(),
                    Command::FocusPrevious => self.focus_previous(),
                    Command::FocusPop => {
                        self.focus_pop();
                    }
                    Command::LockKeys(on) => self.lock_keys(on),
                    Command::Render => render = true,
                }
            }
        }
        if !self.commands.is_empty() {
            debug!("dropping commands after {MAX_COMMAND_ROUNDS} rounds");
            self.commands.clear();
        }
        self.in_commands = false;
        if render {
            self.request_render();
        }
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Deliver one event: screen listeners first, then the focused element
    /// (keys) or the topmost listening element (mouse).
    pub fn dispatch(&mut self, event: &Event) {
        if self.destroyed {
            return;
        }
        if let Event::Resize { .. } = event {
            self.apply_resize();
        }

        let before = (self.focused(), self.lock_keys);
        let mut ls = std::mem::take(&mut self.listeners);
        let mut cmds = Commands::new();
        for l in &mut ls {
            l(event, &mut cmds);
        }
        self.listeners = ls;
        self.commands.append(&mut cmds);
        self.run_commands();

        match event {
            Event::Key(key) => self.dispatch_key(key, before),
            Event::Mouse(mouse) => self.dispatch_mouse(mouse),
            _ => {}
        }
    }

    fn dispatch_key(&mut self, key: &KeyEvent, before: (Option<ElementId>, bool)) {
        if (self.focused(), self.lock_keys) != before {
            return;
        }
        if self.options.tab_navigation && !self.lock_keys {
            let step = match key.full.as_str() {
                "tab" => 1,
                "S-tab" => -1,
                _ => 0,
            };
            if step != 0 {
                self.focus_offset(step);
                self.request_render();
                return;
            }
        }
        if self.lock_keys {
            return;
        }
        let Some(id) = self.focused() else { return };

        if let Some(mut ls) = self.key_listeners.remove(&id) {
            let mut cmds = Commands::new();
            for l in &mut ls {
                l(key, &mut cmds);
            }
            self.key_listeners.insert(id, ls);
            self.commands.append(&mut cmds);
            self.run_commands();
        }

        if self.focused() != Some(id) || !self.tree.get(id).is_some_and(Element::is_scrollable) {
            return;
        }
        let offset = match key.full.as_str() {
            "up" => -LINE_SCROLL,
            "down" => LINE_SCROLL,
            _ => 0,
        };
        if offset != 0 && self.scroll(id, offset) {
            self.request_render();
        }
    }

    fn dispatch_mouse(&mut self, mouse: &MouseEvent) {
        let (x, y) = (i32::from(mouse.x), i32::from(mouse.y));
        let listeners = &self.mouse_listeners;
        if let Some(id) = self.topmost(x, y, |id| listeners.contains_key(&id)) {
            if let Some(mut ls) = self.mouse_listeners.remove(&id) {
                let mut cmds = Commands::new();
                for l in &mut ls {
                    l(mouse, &mut cmds);
                }
                self.mouse_listeners.insert(id, ls);
                self.commands.append(&mut cmds);
            }
            if mouse.action == MouseAction::MouseDown && self.tree.get(id).is_some_and(|e| e.focusable) {
                self.focus(id);
                self.commands.render();
            }
            self.run_commands();
        }

        let offset = match mouse.action {
            MouseAction::WheelUp => -WHEEL_SCROLL,
            MouseAction::WheelDown => WHEEL_SCROLL,
            _ => return,
        };
        let tree = &self.tree;
        if let Some(id) = self.topmost(x, y, |id| tree.get(id).is_some_and(Element::is_scrollable)) {
            if self.scroll(id, offset) {
                self.request_render();
            }
        }
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Screen")
            .field("program", &self.program)
            .field("renders", &self.renders)
            .field("focused", &self.focused())
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::element::{Border, ScrollState};
    use crate::program::{Capture, MouseButton, StaticHost};

    fn screen(options: ScreenOptions) -> (Screen, Capture) {
        let cap = Capture::new();
        let program = Program::new(
            cap.clone(),
            &StaticHost::new(),
            ProgramOptions::default().term("xterm-256color").buffered(false).size(20, 6),
        );
        (Screen::new(program, options), cap)
    }

    fn key(name: &str) -> Event {
        let (name, shift) = match name.strip_prefix("S-") {
            Some(n) => (n, true),
            None => (name, false),
        };
        Event::Key(KeyEvent::new(name, b"").with_modifiers(shift, false, false))
    }

    #[test]
    fn render_then_render_again_is_silent() {
        let (mut s, cap) = screen(ScreenOptions::default());
        s.append(None, Element::new().left(1).top(1).width(5).height(3).border(Border::line()))
            .unwrap();
        s.render();
        assert!(cap.take().contains("┌───┐"));
        s.render();
        assert_eq!(cap.take(), "");
        assert_eq!(s.renders(), 2);
    }

    #[test]
    fn append_rejects_unknown_parent() {
        let (mut s, _) = screen(ScreenOptions::default());
        let a = s.append(None, Element::new()).unwrap();
        s.remove(a);
        assert!(matches!(s.append(Some(a), Element::new()), Err(Error::UnknownElement(_))));
    }

    #[test]
    fn batch_defers_render_to_outermost_end() {
        let (mut s, _) = screen(ScreenOptions::default());
        s.begin_batch();
        s.begin_batch();
        s.request_render();
        s.end_batch();
        assert_eq!(s.renders(), 0);
        s.end_batch();
        assert_eq!(s.renders(), 1);
    }

    #[test]
    fn throttled_render_runs_once_per_interval() {
        let (mut s, _) = screen(ScreenOptions::default().max_fps(10));
        let t0 = Instant::now();
        s.render_throttled(t0);
        s.render_throttled(t0 + Duration::from_millis(20));
        assert!(s.has_throttled_render());
        s.tick(t0 + Duration::from_millis(50));
        assert_eq!(s.renders(), 0);
        s.tick(t0 + Duration::from_millis(100));
        assert_eq!(s.renders(), 1);
        s.render_throttled(t0 + Duration::from_millis(100));
        assert!(s.cancel_throttled_render());
        s.tick(t0 + Duration::from_millis(500));
        assert_eq!(s.renders(), 1);
    }

    #[test]
    fn focus_listeners_see_blur_then_focus() {
        let (mut s, _) = screen(ScreenOptions::default());
        let a = s.append(None, Element::new().focusable(true)).unwrap();
        let b = s.append(None, Element::new().focusable(true)).unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        for id in [a, b] {
            let log = log.clone();
            s.on_focus(id, move |ev, _| log.borrow_mut().push((id, ev)));
        }
        s.focus(a);
        s.focus(b);
        assert_eq!(
            *log.borrow(),
            vec![
                (a, FocusEvent::Focus { previous: None }),
                (a, FocusEvent::Blur { next: Some(b) }),
                (b, FocusEvent::Focus { previous: Some(a) }),
            ]
        );
        s.focus_pop();
        assert_eq!(s.focused(), Some(a));
    }

    #[test]
    fn screen_listener_focus_change_suppresses_element_keys() {
        let (mut s, _) = screen(ScreenOptions::default());
        let a = s.append(None, Element::new().focusable(true)).unwrap();
        let b = s.append(None, Element::new().focusable(true)).unwrap();
        let hits = Rc::new(RefCell::new(0));
        let h = hits.clone();
        s.on_key(a, move |_, _| *h.borrow_mut() += 1);
        s.on_event(move |ev, cmds| {
            if let Event::Key(k) = ev {
                if k.full == "x" {
                    cmds.focus(b);
                }
            }
        });
        s.focus(a);
        s.dispatch(&key("y"));
        assert_eq!(*hits.borrow(), 1);
        s.dispatch(&key("x"));
        assert_eq!(*hits.borrow(), 1);
        assert_eq!(s.focused(), Some(b));
    }

    #[test]
    fn locked_keys_skip_elements() {
        let (mut s, _) = screen(ScreenOptions::default());
        let a = s.append(None, Element::new().focusable(true)).unwrap();
        let hits = Rc::new(RefCell::new(0));
        let h = hits.clone();
        s.on_key(a, move |_, cmds| {
            *h.borrow_mut() += 1;
            cmds.lock_keys(true);
        });
        s.focus(a);
        s.dispatch(&key("q"));
        assert!(s.keys_locked());
        s.dispatch(&key("q"));
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn tab_cycles_focus() {
        let (mut s, _) = screen(ScreenOptions::default());
        let a = s.append(None, Element::new().focusable(true)).unwrap();
        let b = s.append(None, Element::new().focusable(true)).unwrap();
        s.dispatch(&key("tab"));
        assert_eq!(s.focused(), Some(a));
        s.dispatch(&key("tab"));
        assert_eq!(s.focused(), Some(b));
        s.dispatch(&key("S-tab"));
        assert_eq!(s.focused(), Some(a));
    }

    #[test]
    fn mouse_goes_to_topmost_listener_and_focuses() {
        let (mut s, _) = screen(ScreenOptions::default());
        let back = s.append(None, Element::new().left(0).top(0).width(10).height(4)).unwrap();
        let front = s
            .append(None, Element::new().left(2).top(1).width(4).height(2).focusable(true))
            .unwrap();
        let got = Rc::new(RefCell::new(Vec::new()));
        for id in [back, front] {
            let got = got.clone();
            s.on_mouse(id, move |_, _| got.borrow_mut().push(id));
        }
        s.render();
        let click = MouseEvent {
            action: MouseAction::MouseDown,
            button: MouseButton::Left,
            x: 3,
            y: 1,
            shift: false,
            meta: false,
            ctrl: false,
            raw: Vec::new(),
        };
        s.dispatch(&Event::Mouse(click.clone()));
        s.dispatch(&Event::Mouse(MouseEvent { x: 8, ..click }));
        assert_eq!(*got.borrow(), vec![front, back]);
        assert_eq!(s.focused(), Some(front));
    }

    #[test]
    fn removing_focused_element_refocuses_previous() {
        let (mut s, _) = screen(ScreenOptions::default());
        let a = s.append(None, Element::new().focusable(true)).unwrap();
        let b = s.append(None, Element::new().focusable(true)).unwrap();
        s.focus(a);
        s.focus(b);
        s.remove(b);
        assert_eq!(s.focused(), Some(a));
        assert!(s.focus_history().entries().iter().all(|e| *e != b));
    }

    #[test]
    fn full_width_scroll_uses_scroll_region() {
        let (mut s, cap) = screen(ScreenOptions::default());
        let content = (0..10).map(|n| n.to_string()).collect::<Vec<_>>().join("\n");
        let list = s
            .append(
                None,
                Element::new()
                    .left(0)
                    .right(0)
                    .top(0)
                    .height(4)
                    .content(content)
                    .scrollable(ScrollState::new().always_scroll(true)),
            )
            .unwrap();
        s.render();
        cap.take();
        assert!(s.clean_sides(list));
        assert!(s.scroll(list, 1));
        let out = cap.take();
        assert!(out.contains("\x1b[1;4r"));
        assert!(out.contains("\x1b[1M"));
        assert_eq!(s.get(list).and_then(|e| e.scroll).map(|st| st.child_base), Some(1));
        s.render();
        assert!(s.grid().text().starts_with("1 "));
        assert!(s.grid().text().contains("\n4 "));
    }

    #[test]
    fn resize_reallocates_grids() {
        let (mut s, _) = screen(ScreenOptions::default());
        s.resize(30, 8);
        assert_eq!((s.grid().cols(), s.grid().rows()), (30, 8));
        assert!(s.grid().is_dirty(7));
    }

    #[test]
    fn destroy_is_idempotent() {
        let (mut s, cap) = screen(ScreenOptions::default());
        s.destroy();
        cap.take();
        s.destroy();
        s.render();
        assert_eq!(cap.take(), "");
        assert!(s.is_destroyed());
    }
}

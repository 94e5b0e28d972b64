//! # spark-term
//!
//! Retained-mode terminal UI engine for Rust.
//!
//! A tree of rectangular elements is composited into a cell grid, and the
//! grid is reconciled with what the terminal already shows using the fewest
//! control sequences the terminal's capabilities allow. Input bytes go the
//! other way: keys, mouse reports in three dialects, and terminal replies
//! are parsed into structured events.
//!
//! ## Architecture
//!
//! ```text
//! Element tree → Layout (coords, shrink, scroll clipping) → Compositor
//!   → pending grid → junction docking → diff draw → Program → terminal
//! terminal → Program (input parser) → Event → Screen dispatch → listeners
//! ```
//!
//! ## Modules
//!
//! - [`program`] - Terminal I/O driver: capabilities, output, input parsing
//! - [`screen`] - Cell grids, diff renderer, focus, batching
//! - [`element`] - Positions, layout resolution, text, borders, compositing
//! - [`types`] - Packed attributes, cells, render coordinates
//! - [`color`] - 256-colour palette, matching, reduction, blending

pub mod color;
pub mod element;
pub mod error;
pub mod program;
pub mod scheduler;
pub mod screen;
pub mod types;
pub mod unicode;

pub use error::{Error, Result};
pub use types::*;

pub use element::{
    Align, Border, BorderKind, BorderSides, Dim, Element, ElementId, ElementStyle, Layout, Padding,
    Position, ScrollState, Scrollbar, Style, StylePatch, Tree, VAlign,
};

pub use program::{
    Cap, Capabilities, CursorShape, Event, KeyEvent, MouseAction, MouseButton, MouseEvent,
    MouseTracking, Program, ProgramOptions, Response, TerminalFamily,
};

pub use screen::{ArtificialCursor, Command, Commands, FocusEvent, Screen, ScreenOptions};

//! Declared position and size expressions.
//!
//! Each of left/top/right/bottom/width/height is absent or a [`Dim`]:
//! an absolute cell count, a percentage of the parent with an optional
//! offset (`"50%+2"`), `half`, `center` (offsets only) or `shrink`
//! (sizes only).

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// One position or size expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dim {
    Abs(i32),
    /// `pct` percent of the parent's extent, plus `offset` cells.
    Percent { pct: f32, offset: i32 },
    /// Centered on the parent: `parent/2 - own/2`.
    Center,
    /// Fit to content and children.
    Shrink,
}

impl Dim {
    pub const HALF: Dim = Dim::Percent { pct: 50.0, offset: 0 };

    pub fn percent(pct: f32) -> Self {
        Dim::Percent { pct, offset: 0 }
    }

    /// Resolve against a parent extent. `Center` resolves to the parent
    /// midpoint; callers subtract half their own size. `Shrink` resolves
    /// to `None`.
    pub fn resolve(self, parent: i32) -> Option<i32> {
        match self {
            Dim::Abs(n) => Some(n),
            Dim::Percent { pct, offset } => Some((parent as f32 * pct / 100.0) as i32 + offset),
            Dim::Center => Some((parent as f32 * 0.5) as i32),
            Dim::Shrink => None,
        }
    }
}

impl From<i32> for Dim {
    fn from(n: i32) -> Self {
        Dim::Abs(n)
    }
}

impl FromStr for Dim {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let t = s.trim();
        match t {
            "center" => return Ok(Dim::Center),
            "half" => return Ok(Dim::HALF),
            "shrink" => return Ok(Dim::Shrink),
            _ => {}
        }
        if let Ok(n) = t.parse::<i32>() {
            return Ok(Dim::Abs(n));
        }
        let invalid = || Error::InvalidDimension(s.to_string());
        let (pct, rest) = t.split_once('%').ok_or_else(invalid)?;
        let pct: f32 = pct.trim().parse().map_err(|_| invalid())?;
        let rest = rest.trim();
        let offset = if rest.is_empty() {
            0
        } else {
            let n = rest.strip_prefix('+').unwrap_or(rest).trim();
            n.parse::<i32>().map_err(|_| invalid())?
        };
        Ok(Dim::Percent { pct, offset })
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dim::Abs(n) => write!(f, "{n}"),
            Dim::Percent { pct, offset: 0 } => write!(f, "{pct}%"),
            Dim::Percent { pct, offset } if *offset > 0 => write!(f, "{pct}%+{offset}"),
            Dim::Percent { pct, offset } => write!(f, "{pct}%{offset}"),
            Dim::Center => f.write_str("center"),
            Dim::Shrink => f.write_str("shrink"),
        }
    }
}

/// Declared geometry of an element.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub left: Option<Dim>,
    pub top: Option<Dim>,
    pub right: Option<Dim>,
    pub bottom: Option<Dim>,
    pub width: Option<Dim>,
    pub height: Option<Dim>,
}

impl Position {
    pub fn is_shrink(&self) -> bool {
        matches!(self.width, Some(Dim::Shrink)) || matches!(self.height, Some(Dim::Shrink))
    }

    /// Width as a resolvable expression; `shrink` counts as unset.
    pub(crate) fn width_expr(&self) -> Option<Dim> {
        self.width.filter(|d| *d != Dim::Shrink)
    }

    pub(crate) fn height_expr(&self) -> Option<Dim> {
        self.height.filter(|d| *d != Dim::Shrink)
    }
}

/// Interior spacing between border and content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Padding {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

impl Padding {
    pub fn all(n: i32) -> Self {
        Self { left: n, right: n, top: n, bottom: n }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_expressions() {
        assert_eq!("12".parse::<Dim>().unwrap(), Dim::Abs(12));
        assert_eq!("-3".parse::<Dim>().unwrap(), Dim::Abs(-3));
        assert_eq!("50%".parse::<Dim>().unwrap(), Dim::percent(50.0));
        assert_eq!("50%+2".parse::<Dim>().unwrap(), Dim::Percent { pct: 50.0, offset: 2 });
        assert_eq!("100%-1".parse::<Dim>().unwrap(), Dim::Percent { pct: 100.0, offset: -1 });
        assert_eq!("half".parse::<Dim>().unwrap(), Dim::HALF);
        assert_eq!("center".parse::<Dim>().unwrap(), Dim::Center);
        assert_eq!("shrink".parse::<Dim>().unwrap(), Dim::Shrink);
        assert!(matches!("wide".parse::<Dim>(), Err(Error::InvalidDimension(_))));
        assert!("50%x".parse::<Dim>().is_err());
    }

    #[test]
    fn percent_truncates_then_offsets() {
        assert_eq!(Dim::percent(50.0).resolve(81), Some(40));
        assert_eq!(Dim::Percent { pct: 100.0, offset: -2 }.resolve(80), Some(78));
        assert_eq!(Dim::Shrink.resolve(80), None);
    }

    #[test]
    fn display_roundtrips_through_parse() {
        for s in ["7", "25%", "50%+3", "10%-1", "center", "shrink"] {
            let d: Dim = s.parse().unwrap();
            assert_eq!(d.to_string().parse::<Dim>().unwrap(), d);
        }
    }
}

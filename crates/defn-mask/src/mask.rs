//! Boolean masks and coordinate grids.
//!
//! Both are stored row-major with shape `(height, width)`, so `mask[[i, j]]`
//! is row `i` (top to bottom) and column `j` (left to right).

use ndarray::{Array2, Zip};
use thiserror::Error;

use defn_core::ObjectType;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaskError {
    #[error("Mask shapes differ: {left:?} and {right:?}")]
    ShapeMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },

    #[error("At least one mask is required")]
    NoMasks,

    #[error("Invalid image size {width}x{height}")]
    InvalidSize { width: i64, height: i64 },
}

/// A selection of pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask(pub Array2<bool>);

impl ObjectType for Mask {
    const TYPE_NAME: &'static str = "Mask";
}

impl Mask {
    pub fn empty(height: usize, width: usize) -> Self {
        Self(Array2::from_elem((height, width), false))
    }

    pub fn full(height: usize, width: usize) -> Self {
        Self(Array2::from_elem((height, width), true))
    }

    pub fn shape(&self) -> (usize, usize) {
        self.0.dim()
    }

    /// Number of selected pixels.
    pub fn count(&self) -> usize {
        self.0.iter().filter(|selected| **selected).count()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<bool> {
        self.0.get((row, col)).copied()
    }

    pub fn invert(&self) -> Mask {
        Mask(self.0.mapv(|selected| !selected))
    }

    /// Pixels selected in `self` but not in `other`.
    pub fn difference(&self, other: &Mask) -> Result<Mask, MaskError> {
        Mask::all(&[self, &other.invert()])
    }

    /// Pixels selected in any of `masks`.
    pub fn any(masks: &[&Mask]) -> Result<Mask, MaskError> {
        Mask::fold(masks, |a, b| a || b)
    }

    /// Pixels selected in every one of `masks`.
    pub fn all(masks: &[&Mask]) -> Result<Mask, MaskError> {
        Mask::fold(masks, |a, b| a && b)
    }

    fn fold(masks: &[&Mask], op: impl Fn(bool, bool) -> bool) -> Result<Mask, MaskError> {
        let (first, rest) = masks.split_first().ok_or(MaskError::NoMasks)?;
        let mut out = first.0.clone();
        for mask in rest {
            if mask.shape() != first.shape() {
                return Err(MaskError::ShapeMismatch {
                    left: first.shape(),
                    right: mask.shape(),
                });
            }
            Zip::from(&mut out)
                .and(&mask.0)
                .for_each(|acc, &next| *acc = op(*acc, next));
        }
        Ok(Mask(out))
    }
}

/// A grid of coordinate values, one per pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid(pub Array2<f64>);

impl ObjectType for Grid {
    const TYPE_NAME: &'static str = "Grid";
}

impl Grid {
    pub fn filled(height: usize, width: usize, value: f64) -> Self {
        Self(Array2::from_elem((height, width), value))
    }

    pub fn shape(&self) -> (usize, usize) {
        self.0.dim()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.0.get((row, col)).copied()
    }

    /// Select every pixel where `pred` holds.
    pub fn select(&self, pred: impl Fn(f64) -> bool) -> Mask {
        Mask(self.0.mapv(pred))
    }
}

/// Validate a `(width, height)` pair taken from definition inputs.
pub(crate) fn image_size(width: i64, height: i64) -> Result<(usize, usize), MaskError> {
    match (usize::try_from(width), usize::try_from(height)) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => Ok((w, h)),
        _ => Err(MaskError::InvalidSize { width, height }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn combinators() {
        let a = Mask(array![[true, false], [true, false]]);
        let b = Mask(array![[true, true], [false, false]]);

        assert_eq!(
            Mask::any(&[&a, &b]).unwrap(),
            Mask(array![[true, true], [true, false]])
        );
        assert_eq!(
            Mask::all(&[&a, &b]).unwrap(),
            Mask(array![[true, false], [false, false]])
        );
        assert_eq!(
            a.difference(&b).unwrap(),
            Mask(array![[false, false], [true, false]])
        );
        assert_eq!(a.invert().count(), 2);
    }

    #[test]
    fn shape_checks() {
        let small = Mask::empty(2, 2);
        let wide = Mask::full(2, 3);
        assert_eq!(wide.shape(), (2, 3));
        assert_eq!(wide.count(), 6);
        assert_eq!(
            Mask::any(&[&small, &wide]),
            Err(MaskError::ShapeMismatch {
                left: (2, 2),
                right: (2, 3)
            })
        );
        assert_eq!(Mask::all(&[]), Err(MaskError::NoMasks));
    }

    #[test]
    fn sizes_must_be_positive() {
        assert_eq!(image_size(4, 3), Ok((4, 3)));
        assert!(image_size(0, 3).is_err());
        assert!(image_size(4, -1).is_err());
    }
}

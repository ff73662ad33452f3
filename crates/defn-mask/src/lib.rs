//! Defn mask library
//!
//! Coordinate grids, basic shapes and mask operators, all built as `defn`
//! definitions. Shapes are composed from the coordinate definitions they are
//! declared on and combined with `+`, `-` and `*`:
//!
//! ```text
//!   X ─┬─► R, T
//!   Y ─┘
//!   X, Y ──► Circle, Ellipse, SuperEllipse, Square, Rectangle
//!        ──(+, -, *)──► MaskAdd, MaskSub, MaskMul
//! ```

pub mod coords;
pub mod mask;
pub mod ops;
pub mod shapes;

use std::sync::OnceLock;

use tracing::debug;

use defn_core::{Catalog, DefnError, DefnFactory, DefnType, OperatorPool};

pub use mask::{Grid, Mask, MaskError};

/// Every definition of the library, built against one operator pool.
#[derive(Debug, Clone)]
pub struct Library {
    pub x: DefnType,
    pub y: DefnType,
    pub r: DefnType,
    pub t: DefnType,
    pub empty: DefnType,
    pub full: DefnType,
    pub circle: DefnType,
    pub ellipse: DefnType,
    pub super_ellipse: DefnType,
    pub square: DefnType,
    pub rectangle: DefnType,
    pub mask_add: DefnType,
    pub mask_sub: DefnType,
    pub mask_mul: DefnType,
    pool: OperatorPool,
    catalog: Catalog,
}

static GLOBAL_LIBRARY: OnceLock<Result<Library, DefnError>> = OnceLock::new();

impl Library {
    /// Build the library, registering its operators in `pool`.
    ///
    /// Fails if `pool` already holds mask operators.
    pub fn build(pool: &OperatorPool) -> Result<Self, DefnError> {
        let factory = DefnFactory::new().operator_pool(pool);

        let x = coords::x(&factory)?;
        let y = coords::y(&factory)?;
        let library = Library {
            r: coords::r(&factory, &x, &y)?,
            t: coords::t(&factory, &x, &y)?,
            empty: shapes::empty(&factory)?,
            full: shapes::full(&factory)?,
            circle: shapes::circle(&factory, &x, &y)?,
            ellipse: shapes::ellipse(&factory, &x, &y)?,
            super_ellipse: shapes::super_ellipse(&factory, &x, &y)?,
            square: shapes::square(&factory, &x, &y)?,
            rectangle: shapes::rectangle(&factory, &x, &y)?,
            mask_add: ops::mask_add(pool)?,
            mask_sub: ops::mask_sub(pool)?,
            mask_mul: ops::mask_mul(pool)?,
            x,
            y,
            pool: pool.clone(),
            catalog: Catalog::new(),
        };

        for defn in library.definitions() {
            library.catalog.register(defn)?;
        }
        debug!(pool = pool.id().raw(), definitions = library.catalog.len(), "built mask library");
        Ok(library)
    }

    /// The library built against the global operator pool.
    pub fn global() -> Result<&'static Library, DefnError> {
        GLOBAL_LIBRARY
            .get_or_init(|| Library::build(&OperatorPool::global()))
            .as_ref()
            .map_err(Clone::clone)
    }

    pub fn pool(&self) -> &OperatorPool {
        &self.pool
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn get(&self, name: &str) -> Option<DefnType> {
        self.catalog.get(name)
    }

    fn definitions(&self) -> [&DefnType; 14] {
        [
            &self.x,
            &self.y,
            &self.r,
            &self.t,
            &self.empty,
            &self.full,
            &self.circle,
            &self.ellipse,
            &self.super_ellipse,
            &self.square,
            &self.rectangle,
            &self.mask_add,
            &self.mask_sub,
            &self.mask_mul,
        ]
    }
}

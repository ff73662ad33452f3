//! Coordinate definitions.
//!
//! `X` and `Y` map each pixel of a `width` x `height` image onto the square
//! `[-scale, scale]`, widened along the longer side unless `stretch` is set.
//! `R` and `T` are the polar coordinates built on top of them. Because `X`
//! and `Y` both declare `scale` and `stretch`, a definition built on both of
//! them exposes a single `scale` and a single `stretch`, shared by the two.

use ndarray::{Array1, Array2, Zip};

use defn_core::{Args, DType, DefnError, DefnFactory, DefnType, ObjectType, Signature, Value};

use crate::mask::{image_size, Grid};

fn grid_dtype() -> DType {
    Grid::dtype()
}

fn size(args: &Args) -> Result<(usize, usize), DefnError> {
    image_size(args.int("width")?, args.int("height")?).map_err(|err| args.fail(err.to_string()))
}

fn grid<'a>(args: &'a Args, name: &str) -> Result<&'a Array2<f64>, DefnError> {
    args.object::<Grid>(name).map(|grid| &grid.0)
}

/// Half-extent of the axis, widened by `ratio` when it is the longer side.
fn extent(args: &Args, ratio: f64) -> Result<f64, DefnError> {
    let scale = args.float("scale")?;
    if !args.bool("stretch")? && ratio > 1.0 {
        Ok(scale * ratio)
    } else {
        Ok(scale)
    }
}

/// Cartesian `x` coordinates, increasing left to right.
pub fn x(factory: &DefnFactory) -> Result<DefnType, DefnError> {
    factory.define(
        Signature::new("X")
            .doc("Cartesian x coordinates.")
            .input("width", DType::Int)
            .input("height", DType::Int)
            .attr("x0", 0.0)
            .attr("scale", 1.0)
            .attr("stretch", false)
            .returns(grid_dtype()),
        |args| {
            let (width, height) = size(args)?;
            let scale = extent(args, width as f64 / height as f64)?;
            let x0 = args.float("x0")?;

            let xs = Array1::linspace(-scale, scale, width);
            let grid = Array2::from_shape_fn((height, width), |(_, j)| xs[j] - x0);
            Ok(Value::object(Grid(grid)))
        },
    )
}

/// Cartesian `y` coordinates, increasing bottom to top.
pub fn y(factory: &DefnFactory) -> Result<DefnType, DefnError> {
    factory.define(
        Signature::new("Y")
            .doc("Cartesian y coordinates.")
            .input("width", DType::Int)
            .input("height", DType::Int)
            .attr("y0", 0.0)
            .attr("scale", 1.0)
            .attr("stretch", false)
            .returns(grid_dtype()),
        |args| {
            let (width, height) = size(args)?;
            let scale = extent(args, height as f64 / width as f64)?;
            let y0 = args.float("y0")?;

            let ys = Array1::linspace(scale, -scale, height);
            let grid = Array2::from_shape_fn((height, width), |(i, _)| ys[i] - y0);
            Ok(Value::object(Grid(grid)))
        },
    )
}

/// Polar `r` coordinates.
pub fn r(factory: &DefnFactory, x: &DefnType, y: &DefnType) -> Result<DefnType, DefnError> {
    factory.define(
        Signature::new("R")
            .doc("Polar r coordinates.")
            .base("x", x)
            .base("y", y)
            .returns(grid_dtype()),
        |args| {
            let (x, y) = (grid(args, "x")?, grid(args, "y")?);
            if x.dim() != y.dim() {
                return Err(args.fail("x and y grids differ in shape"));
            }
            let r = Zip::from(x).and(y).map_collect(|x, y| x.hypot(*y));
            Ok(Value::object(Grid(r)))
        },
    )
}

/// Polar `t` coordinates, the angle from the positive `x` axis.
pub fn t(factory: &DefnFactory, x: &DefnType, y: &DefnType) -> Result<DefnType, DefnError> {
    factory.define(
        Signature::new("T")
            .doc("Polar t coordinates.")
            .base("x", x)
            .base("y", y)
            .attr("t0", 0.0)
            .returns(grid_dtype()),
        |args| {
            let (x, y) = (grid(args, "x")?, grid(args, "y")?);
            if x.dim() != y.dim() {
                return Err(args.fail("x and y grids differ in shape"));
            }
            let t0 = args.float("t0")?;
            let t = Zip::from(y).and(x).map_collect(|y, x| y.atan2(*x) - t0);
            Ok(Value::object(Grid(t)))
        },
    )
}

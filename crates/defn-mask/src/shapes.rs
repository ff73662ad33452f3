//! Basic shapes.

use ndarray::{Array2, Zip};

use defn_core::{Args, DType, DefnError, DefnFactory, DefnType, ObjectType, Signature, Value};

use crate::mask::{image_size, Grid, Mask};

fn mask_dtype() -> DType {
    Mask::dtype()
}

fn size(args: &Args) -> Result<(usize, usize), DefnError> {
    image_size(args.int("width")?, args.int("height")?).map_err(|err| args.fail(err.to_string()))
}

fn optional_float(args: &Args, name: &str) -> Result<Option<f64>, DefnError> {
    if args.get(name)?.is_none() {
        return Ok(None);
    }
    args.float(name).map(Some)
}

/// Optional line thickness; `None` draws a filled shape.
fn thickness(args: &Args) -> Result<Option<f64>, DefnError> {
    optional_float(args, "pt")
}

/// Pixels where `field` is below `limit`, or with `pt` set, those strictly
/// between `(1 - pt) * limit` and `(1 + pt) * limit`.
fn level_set(field: &Array2<f64>, limit: f64, pt: Option<f64>) -> Mask {
    match pt {
        None => Mask(field.mapv(|d| d < limit)),
        Some(pt) => {
            let (inner, outer) = ((1.0 - pt) * limit, (1.0 + pt) * limit);
            Mask(field.mapv(|d| inner < d && d < outer))
        }
    }
}

/// An axis-aligned box of half-extents `(w, h)` centred on `(xc, yc)`. With
/// `pt` set only the band between the boxes scaled by `1 - pt` and `1 + pt`
/// is kept.
fn boxed(x: &Grid, y: &Grid, centre: (f64, f64), half: (f64, f64), pt: Option<f64>) -> Mask {
    let (xc, yc) = centre;
    let within = |scale: f64| {
        let (w, h) = (scale * half.0, scale * half.1);
        Zip::from(&x.0)
            .and(&y.0)
            .map_collect(|x, y| (x - xc).abs() < w && (y - yc).abs() < h)
    };
    match pt {
        None => Mask(within(1.0)),
        Some(pt) => {
            let outer = within(1.0 + pt);
            let inner = within(1.0 - pt);
            Mask(
                Zip::from(&outer)
                    .and(&inner)
                    .map_collect(|outer, inner| *outer && !*inner),
            )
        }
    }
}

fn xy<'a>(args: &'a Args) -> Result<(&'a Grid, &'a Grid), DefnError> {
    let x = args.object::<Grid>("x")?;
    let y = args.object::<Grid>("y")?;
    if x.shape() != y.shape() {
        return Err(args.fail("x and y grids differ in shape"));
    }
    Ok((x, y))
}

pub fn empty(factory: &DefnFactory) -> Result<DefnType, DefnError> {
    factory.define(
        Signature::new("Empty")
            .doc("An empty mask.")
            .input("width", DType::Int)
            .input("height", DType::Int)
            .returns(mask_dtype()),
        |args| {
            let (width, height) = size(args)?;
            Ok(Value::object(Mask::empty(height, width)))
        },
    )
}

pub fn full(factory: &DefnFactory) -> Result<DefnType, DefnError> {
    factory.define(
        Signature::new("Full")
            .doc("A mask selecting every pixel.")
            .input("width", DType::Int)
            .input("height", DType::Int)
            .returns(mask_dtype()),
        |args| {
            let (width, height) = size(args)?;
            Ok(Value::object(Mask::full(height, width)))
        },
    )
}

/// A circle centred on `(xc, yc)` selecting pixels closer than `r * r`; with
/// `pt` set only a ring of relative thickness `pt` is drawn.
pub fn circle(factory: &DefnFactory, x: &DefnType, y: &DefnType) -> Result<DefnType, DefnError> {
    factory.define(
        Signature::new("Circle")
            .doc("A circle.")
            .base("x", x)
            .base("y", y)
            .attr("xc", 0.0)
            .attr("yc", 0.0)
            .attr("r", 0.8)
            .attr("pt", Value::None)
            .returns(mask_dtype()),
        |args| {
            let (x, y) = xy(args)?;
            let (xc, yc) = (args.float("xc")?, args.float("yc")?);
            let r2 = args.float("r")?.powi(2);
            let pt = thickness(args)?;

            let dist = Zip::from(&x.0)
                .and(&y.0)
                .map_collect(|x, y| (x - xc).hypot(y - yc));
            Ok(Value::object(level_set(&dist, r2, pt)))
        },
    )
}

/// An axis-aligned square of half-width `size` centred on `(xc, yc)`. With
/// `pt` set only the outline between `(1 - pt) * size` and `(1 + pt) * size`
/// is drawn.
pub fn square(factory: &DefnFactory, x: &DefnType, y: &DefnType) -> Result<DefnType, DefnError> {
    factory.define(
        Signature::new("Square")
            .doc("A square.")
            .base("x", x)
            .base("y", y)
            .attr("xc", 0.0)
            .attr("yc", 0.0)
            .attr("size", 0.8)
            .attr("pt", Value::None)
            .returns(mask_dtype()),
        |args| {
            let (x, y) = xy(args)?;
            let centre = (args.float("xc")?, args.float("yc")?);
            let size = args.float("size")?;
            Ok(Value::object(boxed(x, y, centre, (size, size), thickness(args)?)))
        },
    )
}

/// An ellipse `((x - xc) / a)^2 + ((y - yc) / b)^2 < r^2`, compared the same
/// way as [`circle`], so `a = b = 1` gives the circle back.
pub fn ellipse(factory: &DefnFactory, x: &DefnType, y: &DefnType) -> Result<DefnType, DefnError> {
    factory.define(
        Signature::new("Ellipse")
            .doc("An ellipse.")
            .base("x", x)
            .base("y", y)
            .attr("xc", 0.0)
            .attr("yc", 0.0)
            .attr("a", 2.0)
            .attr("b", 1.0)
            .attr("r", 0.8)
            .attr("pt", Value::None)
            .returns(mask_dtype()),
        |args| {
            let (x, y) = xy(args)?;
            let (xc, yc) = (args.float("xc")?, args.float("yc")?);
            let (a2, b2) = (args.float("a")?.powi(2), args.float("b")?.powi(2));
            let r2 = args.float("r")?.powi(2);

            let dist = Zip::from(&x.0)
                .and(&y.0)
                .map_collect(|x, y| ((x - xc).powi(2) / a2 + (y - yc).powi(2) / b2).sqrt());
            Ok(Value::object(level_set(&dist, r2, thickness(args)?)))
        },
    )
}

/// A superellipse `|(x - xc) / a|^n + |(y - yc) / b|^m < r`; `m` defaults to `n`.
pub fn super_ellipse(
    factory: &DefnFactory,
    x: &DefnType,
    y: &DefnType,
) -> Result<DefnType, DefnError> {
    factory.define(
        Signature::new("SuperEllipse")
            .doc("A superellipse.")
            .base("x", x)
            .base("y", y)
            .attr("xc", 0.0)
            .attr("yc", 0.0)
            .attr("a", 1.0)
            .attr("b", 1.0)
            .attr("n", 3.0)
            .attr("r", 0.8)
            .attr("m", Value::None)
            .attr("pt", Value::None)
            .returns(mask_dtype()),
        |args| {
            let (x, y) = xy(args)?;
            let (xc, yc) = (args.float("xc")?, args.float("yc")?);
            let (a, b) = (args.float("a")?, args.float("b")?);
            let n = args.float("n")?;
            let m = optional_float(args, "m")?.unwrap_or(n);

            let field = Zip::from(&x.0)
                .and(&y.0)
                .map_collect(|x, y| ((x - xc) / a).abs().powf(n) + ((y - yc) / b).abs().powf(m));
            Ok(Value::object(level_set(&field, args.float("r")?, thickness(args)?)))
        },
    )
}

/// A rectangle of area `size` whose width is `ratio` times its height.
///
/// The half-extents are `h = sqrt(size / ratio)` and `w = h * ratio`; `pt`
/// scales both for the outline as in [`square`].
pub fn rectangle(factory: &DefnFactory, x: &DefnType, y: &DefnType) -> Result<DefnType, DefnError> {
    factory.define(
        Signature::new("Rectangle")
            .doc("A rectangle.")
            .base("x", x)
            .base("y", y)
            .attr("xc", 0.0)
            .attr("yc", 0.0)
            .attr("size", 0.6)
            .attr("ratio", 1.618)
            .attr("pt", Value::None)
            .returns(mask_dtype()),
        |args| {
            let (x, y) = xy(args)?;
            let centre = (args.float("xc")?, args.float("yc")?);
            let ratio = args.float("ratio")?;
            if ratio <= 0.0 {
                return Err(args.fail(format!("ratio must be positive, got {ratio}")));
            }
            let height = (args.float("size")? / ratio).sqrt();
            let half = (height * ratio, height);
            Ok(Value::object(boxed(x, y, centre, half, thickness(args)?)))
        },
    )
}

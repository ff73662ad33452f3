//! Mask operators.
//!
//! Each operator holds two mask producing definitions, `a` and `b`, and
//! evaluates both at the requested image size before combining them:
//!
//! - `a + b` selects pixels in either mask,
//! - `a - b` selects pixels in `a` but not in `b`,
//! - `a * b` selects pixels in both masks.

use defn_core::{
    kwargs, Args, DType, DefnError, DefnFactory, DefnType, ObjectType, Operation, OperatorPool,
    Signature, Value,
};

use crate::mask::{Mask, MaskError};

fn operand_dtype() -> DType {
    DType::defn(Mask::dtype())
}

/// Evaluate operand `name` at the size given to the operator.
fn operand(args: &Args, name: &str) -> Result<Mask, DefnError> {
    let inputs = kwargs([
        ("width", args.get("width")?.clone()),
        ("height", args.get("height")?.clone()),
    ]);
    let value = args.defn(name)?.call(&inputs)?;
    value
        .downcast_ref::<Mask>()
        .cloned()
        .ok_or_else(|| args.fail(format!("operand '{name}' produced {}", value.type_name())))
}

fn define(
    pool: &OperatorPool,
    operation: Operation,
    name: &str,
    doc: &str,
    combine: fn(&Mask, &Mask) -> Result<Mask, MaskError>,
) -> Result<DefnType, DefnError> {
    DefnFactory::new()
        .operation(operation)
        .operator_pool(pool)
        .define(
            Signature::new(name)
                .doc(doc)
                .input("width", DType::Int)
                .input("height", DType::Int)
                .required_attr("a", operand_dtype())
                .required_attr("b", operand_dtype())
                .returns(Mask::dtype()),
            move |args| {
                let (a, b) = (operand(args, "a")?, operand(args, "b")?);
                let mask = combine(&a, &b).map_err(|err| args.fail(err.to_string()))?;
                Ok(Value::object(mask))
            },
        )
}

pub fn mask_add(pool: &OperatorPool) -> Result<DefnType, DefnError> {
    define(
        pool,
        Operation::Add,
        "MaskAdd",
        "Select pixels in either of two masks.",
        |a, b| Mask::any(&[a, b]),
    )
}

pub fn mask_sub(pool: &OperatorPool) -> Result<DefnType, DefnError> {
    define(
        pool,
        Operation::Sub,
        "MaskSub",
        "Select pixels in the first mask and not in the second.",
        |a, b| a.difference(b),
    )
}

pub fn mask_mul(pool: &OperatorPool) -> Result<DefnType, DefnError> {
    define(
        pool,
        Operation::Mul,
        "MaskMul",
        "Select pixels in both of two masks.",
        |a, b| Mask::all(&[a, b]),
    )
}

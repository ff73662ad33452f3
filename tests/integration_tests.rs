//! Integration tests across the workspace
//!
//! These tests exercise the crates together:
//! - user definitions built on top of the mask library
//! - operator dispatch through the global pool
//! - evaluator configuration from JSON and the environment
//!
//! Run with: cargo test --test integration_tests

use approx::assert_abs_diff_eq;

use defn_core::*;
use defn_mask::{Grid, Library, Mask};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn size(width: i64, height: i64) -> Kwargs {
    kwargs([("width", width), ("height", height)])
}

// ============================================================================
// User definitions on top of the library
// ============================================================================

#[test]
fn test_user_shape_inherits_library_inputs() -> anyhow::Result<()> {
    init_tracing();
    let pool = OperatorPool::new();
    let lib = Library::build(&pool)?;

    // A band of width `w` around the x axis.
    let band = DefnFactory::new().operator_pool(&pool).define(
        Signature::new("Band")
            .base("y", &lib.y)
            .attr("w", 0.25)
            .returns(Mask::dtype()),
        |args| {
            let y = args.object::<Grid>("y")?;
            let w = args.float("w")?;
            Ok(Value::object(y.select(|v| v.abs() < w)))
        },
    )?;

    let names: Vec<&str> = band.inputs(true).map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["width", "height"]);
    assert!(band.input("width").map(|i| i.inherited).unwrap_or(false));

    let stripe = band.default_instance()?.call(&size(4, 5))?;
    let stripe = stripe.downcast_ref::<Mask>().cloned().expect("mask");
    assert_eq!(stripe.count(), 4);

    // Bands combine with library shapes through the same pool.
    let circle = lib.circle.default_instance()?;
    let cross = (&band.default_instance()? + &circle)?;
    let cross = cross.call(&size(5, 5))?;
    assert_eq!(cross.downcast_ref::<Mask>().map(Mask::count), Some(7));
    Ok(())
}

#[test]
fn test_override_replaces_library_base() -> anyhow::Result<()> {
    let lib = Library::build(&OperatorPool::new())?;
    let circle = lib.circle.default_instance()?;

    let mut inputs = size(3, 3);
    inputs.insert("x".to_string(), Value::object(Grid::filled(3, 3, 0.0)));
    inputs.insert("y".to_string(), Value::object(Grid::filled(3, 3, 0.0)));

    let every = circle.call(&inputs)?;
    assert_eq!(every.downcast_ref::<Mask>().map(Mask::count), Some(9));

    // Polar coordinates computed from supplied grids.
    let mut inputs = size(2, 2);
    inputs.insert("x".to_string(), Value::object(Grid::filled(2, 2, 3.0)));
    inputs.insert("y".to_string(), Value::object(Grid::filled(2, 2, 4.0)));
    let r = lib.r.default_instance()?.call(&inputs)?;
    let r = r.downcast_ref::<Grid>().cloned().expect("grid");
    assert_eq!(r.shape(), (2, 2));
    assert_abs_diff_eq!(r.get(1, 0).unwrap_or(f64::NAN), 5.0, epsilon = 1e-12);

    let t = lib.t.instance([("t0", 0.5)])?.call(&inputs)?;
    let t = t.downcast_ref::<Grid>().cloned().expect("grid");
    assert_abs_diff_eq!(
        t.get(0, 1).unwrap_or(f64::NAN),
        4.0_f64.atan2(3.0) - 0.5,
        epsilon = 1e-12
    );
    Ok(())
}

// ============================================================================
// Global pool and catalog
// ============================================================================

#[test]
fn test_global_library_dispatches_on_global_pool() -> anyhow::Result<()> {
    let lib = Library::global()?;
    let square = lib.square.default_instance()?;
    let circle = lib.circle.default_instance()?;

    let ring = OperatorPool::global().subtract(&square, &circle)?;
    assert_eq!(ring.defn_type(), &lib.mask_sub);
    let ring = ring.call(&size(5, 5))?;
    assert_eq!(ring.downcast_ref::<Mask>().map(Mask::count), Some(4));

    let names = lib.catalog().names();
    assert!(names.contains(&"MaskMul".to_string()));
    assert_eq!(lib.get("T").map(|t| t.bases().len()), Some(2));
    Ok(())
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_memoised_library_evaluation_matches_plain() -> anyhow::Result<()> {
    init_tracing();
    let lib = Library::build(&OperatorPool::new())?;

    // R and T both sit on X and Y, so the coordinate grids are reached twice.
    let polar = definition(
        Signature::new("UpperDisc")
            .base("r", &lib.r)
            .base("t", &lib.t)
            .returns(Mask::dtype()),
        |args| {
            let r = args.object::<Grid>("r")?;
            let t = args.object::<Grid>("t")?;
            let inside = r.select(|v| v < 1.0);
            let upper = t.select(|v| v > 0.0);
            Mask::all(&[&inside, &upper])
                .map(Value::object)
                .map_err(|err| args.fail(err.to_string()))
        },
    )?
    .default_instance()?;

    let plain = Evaluator::default();
    let memo = Evaluator::new(EvalConfig::from_json(
        r#"{ "memoize_bases": true, "trace_arguments": true }"#,
    )?);

    let (a, plain_stats) = plain.evaluate_with_stats(&polar, &size(5, 5))?;
    let (b, memo_stats) = memo.evaluate_with_stats(&polar, &size(5, 5))?;

    let a = a.downcast_ref::<Mask>().cloned().expect("mask");
    let b = b.downcast_ref::<Mask>().cloned().expect("mask");
    assert_eq!(a, b);
    assert_eq!(a.count(), 4);

    assert_eq!(plain_stats.evaluations, 7);
    assert_eq!(plain_stats.cache_hits, 0);
    assert_eq!(memo_stats.evaluations, 5);
    assert_eq!(memo_stats.cache_hits, 2);
    Ok(())
}

#[test]
fn test_evaluator_from_env() -> anyhow::Result<()> {
    // The only test in this binary that touches the process environment.
    std::env::set_var(defn_core::config::MEMOIZE_BASES_ENV, "yes");
    let evaluator = Evaluator::from_env();
    std::env::remove_var(defn_core::config::MEMOIZE_BASES_ENV);

    assert!(evaluator.config().memoize_bases);
    assert!(!evaluator.config().trace_arguments);

    let lib = Library::build(&OperatorPool::new())?;
    let disc = lib.circle.default_instance()?;
    let (value, stats) = evaluator.evaluate_with_stats(&disc, &size(5, 5))?;
    assert_eq!(value.downcast_ref::<Mask>().map(Mask::count), Some(5));
    assert_eq!(stats.evaluations, 3);
    Ok(())
}

#[test]
fn test_config_from_lookup() {
    let config = EvalConfig::from_lookup(|name| {
        (name == defn_core::config::MEMOIZE_BASES_ENV).then(|| "on".to_string())
    });
    assert_eq!(
        config,
        EvalConfig {
            memoize_bases: true,
            trace_arguments: false,
        }
    );
    assert_eq!(Evaluator::new(config).config(), &config);
}

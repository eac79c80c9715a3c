mod common;
use common::{noise, rows, sinusoid, spike_train};
use megica::removal::reconstruct;
use megica::{remove_components, IcaError, IndependentComponents, Signal};
use ndarray::{array, Array3};

fn continuous() -> (Signal, IndependentComponents) {
    let s = rows(&[sinusoid(300, 10.0, 100.0, 1.0), spike_train(300, 30, 4.0), noise(300, 31)]);
    let a = array![[1.0, 0.2, -0.4], [0.5, 1.0, 0.0], [-0.3, 0.6, 1.0], [0.0, 0.1, 0.9]];
    let w = array![[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0]];
    let ic = IndependentComponents::new(a, w, Signal::from(s)).unwrap();
    let extra = rows(&[noise(300, 32), noise(300, 33), noise(300, 34), noise(300, 35)]);
    let Signal::Continuous(recon) = reconstruct(&ic) else { unreachable!() };
    (Signal::from(recon + &(extra * 0.01)), ic)
}

#[test]
fn empty_list_is_identity() {
    let (data, ic) = continuous();
    assert_eq!(remove_components(&data, &ic, &[]).unwrap(), data);
}

#[test]
fn removing_everything_leaves_the_residual() {
    let (data, ic) = continuous();
    let cleaned = remove_components(&data, &ic, &[0, 1, 2]).unwrap();
    let (Signal::Continuous(c), Signal::Continuous(d), Signal::Continuous(r)) = (&cleaned, &data, &reconstruct(&ic)) else {
        unreachable!()
    };
    for ((x, y), z) in c.iter().zip(d.iter()).zip(r.iter()) {
        approx::assert_abs_diff_eq!(*x, y - z, epsilon = 1e-12);
        assert!(x.abs() <= 0.01 + 1e-12);
    }
}

#[test]
fn duplicate_indices_are_removed_once() {
    let (data, ic) = continuous();
    let once = remove_components(&data, &ic, &[1]).unwrap();
    let dup = remove_components(&data, &ic, &[1, 1]).unwrap();
    assert_eq!(once, dup);
}

#[test]
fn epoched_removal_of_everything_is_near_zero() {
    let s = Array3::from_shape_fn((4, 2, 50), |(e, k, t)| ((e + 1) as f64) * ((t * (k + 1)) as f64 * 0.2).sin());
    let a = array![[1.0, -1.0], [2.0, 0.5], [0.0, 1.0]];
    let w = array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
    let ic = IndependentComponents::new(a, w, Signal::from(s)).unwrap();
    let data = reconstruct(&ic);
    let Signal::Epoched(c) = remove_components(&data, &ic, &[0, 1]).unwrap() else { panic!("layout changed") };
    assert_eq!(c.dim(), (4, 3, 50));
    assert!(c.iter().all(|v| v.abs() < 1e-12));
}

#[test]
fn mismatched_channel_count_is_a_shape_error() {
    let (_, ic) = continuous();
    let data = Signal::from(rows(&[noise(300, 1), noise(300, 2)]));
    assert!(matches!(remove_components(&data, &ic, &[0]), Err(IcaError::Shape(_))));
}

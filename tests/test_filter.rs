mod common;
use common::{rows, sinusoid};
use megica::config::FilterSpec;
use megica::filter::{apply_cosine_filter, prepare_cosine_filter, PassKind, Window};
use ndarray::Array2;

fn max_abs(x: &[f64]) -> f64 {
    x.iter().fold(0.0, |m, v| m.max(v.abs()))
}

// 1000 samples at 1000 Hz: 1 Hz bins, every test tone sits on a bin.
fn mixture(parts: &[(f64, f64)], offset: f64) -> Array2<f64> {
    let mut x = vec![offset; 1000];
    for &(f0, amp) in parts {
        for (v, s) in x.iter_mut().zip(sinusoid(1000, f0, 1000.0, amp)) {
            *v += s;
        }
    }
    rows(&[x])
}

#[test]
fn default_band_pass_keeps_alpha_and_drops_dc_and_gamma() {
    let mut x = mixture(&[(10.0, 1.0), (40.0, 3.0)], 5.0);
    let filt = prepare_cosine_filter(&FilterSpec::default(), 1000).unwrap();
    apply_cosine_filter(&mut x, &filt).unwrap();

    let expected = sinusoid(1000, 10.0, 1000.0, 1.0);
    let err: Vec<f64> = x.row(0).iter().zip(&expected).map(|(a, b)| a - b).collect();
    assert!(max_abs(&err) < 1e-9, "max error {}", max_abs(&err));
}

#[test]
fn notch_removes_line_noise_only() {
    let spec = FilterSpec {
        sfreq: 1000.0,
        win: Window::Boxcar,
        par: vec![PassKind::Notch],
        freq: vec![50.0],
        width: vec![4.0],
    };
    let mut x = mixture(&[(10.0, 1.0), (50.0, 2.0)], 0.0);
    let filt = prepare_cosine_filter(&spec, 1000).unwrap();
    apply_cosine_filter(&mut x, &filt).unwrap();

    let expected = sinusoid(1000, 10.0, 1000.0, 1.0);
    let err: Vec<f64> = x.row(0).iter().zip(&expected).map(|(a, b)| a - b).collect();
    assert!(max_abs(&err) < 1e-9);
}

#[test]
fn filter_spec_reads_keyword_aliases() {
    let spec: FilterSpec = serde_json::from_str(
        r#"{ "sfreq": 600, "win": "hanning", "par": ["highpass", "lowpass", "bandstop"],
             "freq": [0.5, 40, 50], "width": [0.5, 5, 2] }"#,
    )
    .unwrap();
    assert_eq!(spec.win, Window::Hann);
    assert_eq!(spec.par, vec![PassKind::High, PassKind::Low, PassKind::Notch]);
    assert_eq!(spec.freq, vec![0.5, 40.0, 50.0]);
}

#[test]
fn filter_length_must_match_rows() {
    let filt = prepare_cosine_filter(&FilterSpec::default(), 500).unwrap();
    let mut x = mixture(&[(10.0, 1.0)], 0.0);
    assert!(apply_cosine_filter(&mut x, &filt).is_err());
}

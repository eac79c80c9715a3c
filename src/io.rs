//! Safetensors I/O for recordings and IC results.
//!
//! Reader: `Recording::load` parses a file holding
//!   `data`     F32/F64 `[N, T]` or `[K, N, T]`
//!   `extdata`  optional reference channels, same layout as `data`
//!   `sfreq`    F32/F64 scalar
//!   `ch_names` optional U8 blob, newline separated
//! Writer: [`StWriter`] builds a file tensor by tensor; [`write_ic`] /
//! [`load_ic`] store and restore the IC record with its verdict.
use anyhow::{bail, Context, Result};
use ndarray::{Array2, Array3};
use std::collections::HashMap;
use std::path::Path;

use crate::header::MegHeader;
use crate::ic::IndependentComponents;
use crate::signal::Signal;
use crate::verdict::Verdict;

// ── Low-level safetensors parser ─────────────────────────────────────────────

/// A parsed safetensors buffer: JSON header plus the byte payload.
struct SafeTensors<'a> {
    header: HashMap<String, serde_json::Value>,
    payload: &'a [u8],
}

impl<'a> SafeTensors<'a> {
    fn parse(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() < 8 {
            bail!("safetensors file too small");
        }
        let mut len = [0u8; 8];
        len.copy_from_slice(&bytes[..8]);
        let n = u64::from_le_bytes(len) as usize;
        let header_end = 8usize.checked_add(n).filter(|&e| e <= bytes.len()).context("truncated header")?;
        let mut header: HashMap<String, serde_json::Value> =
            serde_json::from_slice(&bytes[8..header_end]).context("failed to parse safetensors header")?;
        header.remove("__metadata__");
        Ok(Self { header, payload: &bytes[header_end..] })
    }

    /// `(dtype, shape, bytes)` of `name`, or `None` when absent.
    fn raw(&self, name: &str) -> Result<Option<(&str, Vec<usize>, &'a [u8])>> {
        let Some(entry) = self.header.get(name) else {
            return Ok(None);
        };
        let dtype = entry["dtype"].as_str().with_context(|| format!("'{name}': missing dtype"))?;
        let shape = entry["shape"]
            .as_array()
            .with_context(|| format!("'{name}': missing shape"))?
            .iter()
            .map(|v| v.as_u64().map(|d| d as usize))
            .collect::<Option<Vec<_>>>()
            .with_context(|| format!("'{name}': malformed shape"))?;
        let offsets = entry["data_offsets"].as_array().with_context(|| format!("'{name}': missing offsets"))?;
        let (s, e) = match offsets.as_slice() {
            [s, e] => (
                s.as_u64().context("bad offset")? as usize,
                e.as_u64().context("bad offset")? as usize,
            ),
            _ => bail!("'{name}': malformed data_offsets"),
        };
        if s > e || e > self.payload.len() {
            bail!("'{name}': data offsets {s}..{e} outside payload of {} bytes", self.payload.len());
        }
        Ok(Some((dtype, shape, &self.payload[s..e])))
    }

    /// Floating-point tensor widened to `f64`.
    fn floats(&self, name: &str) -> Result<Option<(Vec<usize>, Vec<f64>)>> {
        let Some((dtype, shape, raw)) = self.raw(name)? else {
            return Ok(None);
        };
        let values: Vec<f64> = match dtype {
            "F32" => raw
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
                .collect(),
            "F64" => raw
                .chunks_exact(8)
                .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
                .collect(),
            other => bail!("'{name}': expected F32 or F64, found {other}"),
        };
        if values.len() != shape.iter().product::<usize>() {
            bail!("'{name}': {} values for shape {shape:?}", values.len());
        }
        Ok(Some((shape, values)))
    }

    fn matrix(&self, name: &str) -> Result<Option<Array2<f64>>> {
        match self.floats(name)? {
            None => Ok(None),
            Some((shape, v)) => match shape.as_slice() {
                &[r, c] => Ok(Some(Array2::from_shape_vec((r, c), v)?)),
                _ => bail!("'{name}': expected a 2-D tensor, found shape {shape:?}"),
            },
        }
    }

    fn signal(&self, name: &str) -> Result<Option<Signal>> {
        match self.floats(name)? {
            None => Ok(None),
            Some((shape, v)) => match shape.as_slice() {
                &[r, t] => Ok(Some(Signal::from(Array2::from_shape_vec((r, t), v)?))),
                &[k, r, t] => Ok(Some(Signal::from(Array3::from_shape_vec((k, r, t), v)?))),
                _ => bail!("'{name}': expected a 2-D or 3-D tensor, found shape {shape:?}"),
            },
        }
    }

    fn scalar(&self, name: &str) -> Result<Option<f64>> {
        Ok(self.floats(name)?.and_then(|(_, v)| v.first().copied()))
    }

    fn strings(&self, name: &str) -> Result<Vec<String>> {
        let Some((_, _, raw)) = self.raw(name)? else {
            return Ok(vec![]);
        };
        Ok(std::str::from_utf8(raw)?
            .split('\n')
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect())
    }

    fn indices(&self, name: &str) -> Result<Vec<usize>> {
        let Some((dtype, _, raw)) = self.raw(name)? else {
            return Ok(vec![]);
        };
        if dtype != "I64" {
            bail!("'{name}': expected I64 indices, found {dtype}");
        }
        raw.chunks_exact(8)
            .map(|b| {
                let v = i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]);
                usize::try_from(v).with_context(|| format!("'{name}': negative index {v}"))
            })
            .collect()
    }
}

// ── Public structs ────────────────────────────────────────────────────────────

/// A recording to decompose or clean.
#[derive(Debug, Clone)]
pub struct Recording {
    /// `[N, T]` or `[K, N, T]`, original units.
    pub data: Signal,
    /// Reference channels (EOG, ECG, ...), same layout as `data`.
    pub extdata: Option<Signal>,
    /// Sampling rate (Hz).
    pub sfreq: f64,
    /// Channel names (may be empty if not saved).
    pub ch_names: Vec<String>,
}

impl Recording {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let st = SafeTensors::parse(&bytes)?;

        let data = st.signal("data")?.context("missing 'data' key")?;
        let extdata = st.signal("extdata")?;
        let sfreq = st.scalar("sfreq")?.context("missing 'sfreq' key")?;
        let ch_names = st.strings("ch_names")?;

        log::debug!("loaded recording {:?} at {sfreq} Hz from {}", data.shape(), path.display());
        Ok(Recording { data, extdata, sfreq, ch_names })
    }

    pub fn header(&self) -> MegHeader {
        MegHeader::new(self.ch_names.clone(), self.sfreq)
    }
}

// ── Generic safetensors builder ───────────────────────────────────────────────

/// Simple safetensors file writer for F32, F64, I64 and U8 tensors.
///
/// ```rust,no_run
/// use megica::io::StWriter;
/// use std::path::Path;
/// let mut w = StWriter::new();
/// w.add_f32("signal", &[1.0f32, 2.0, 3.0], &[1, 3]);
/// w.add_f64("signal_d", &[1.0f64, 2.0, 3.0], &[1, 3]);
/// w.write(Path::new("/tmp/out.safetensors")).unwrap();
/// ```
#[derive(Default)]
pub struct StWriter {
    entries: Vec<(String, Vec<u8>, &'static str, Vec<usize>)>,
}

impl StWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_f32(&mut self, name: &str, data: &[f32], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F32", shape.to_vec()));
    }

    pub fn add_f64(&mut self, name: &str, data: &[f64], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F64", shape.to_vec()));
    }

    pub fn add_f64_arr2(&mut self, name: &str, arr: &Array2<f64>) {
        let data: Vec<f64> = arr.iter().copied().collect();
        self.add_f64(name, &data, &[arr.nrows(), arr.ncols()]);
    }

    pub fn add_signal(&mut self, name: &str, sig: &Signal) {
        let data: Vec<f64> = match sig {
            Signal::Continuous(x) => x.iter().copied().collect(),
            Signal::Epoched(x) => x.iter().copied().collect(),
        };
        self.add_f64(name, &data, &sig.shape());
    }

    pub fn add_indices(&mut self, name: &str, idx: &[usize]) {
        let bytes: Vec<u8> = idx.iter().flat_map(|&v| (v as i64).to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "I64", vec![idx.len()]));
    }

    /// Newline-joined UTF-8 strings as a U8 tensor.
    pub fn add_strings(&mut self, name: &str, items: &[String]) {
        let bytes = items.join("\n").into_bytes();
        let len = bytes.len();
        self.entries.push((name.to_string(), bytes, "U8", vec![len]));
    }

    /// JSON header with contiguous `data_offsets`, space padded to a
    /// multiple of 8 bytes.
    fn header_bytes(&self) -> Result<Vec<u8>> {
        let mut offset = 0usize;
        let header: serde_json::Map<String, serde_json::Value> = self
            .entries
            .iter()
            .map(|(name, data, dtype, shape)| {
                let entry = serde_json::json!({
                    "dtype": dtype,
                    "shape": shape,
                    "data_offsets": [offset, offset + data.len()],
                });
                offset += data.len();
                (name.clone(), entry)
            })
            .collect();
        let mut bytes = serde_json::to_vec(&header)?;
        bytes.resize(bytes.len().next_multiple_of(8), b' ');
        Ok(bytes)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        use std::io::Write;
        let header = self.header_bytes()?;
        let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut out = std::io::BufWriter::new(file);
        out.write_all(&(header.len() as u64).to_le_bytes())?;
        out.write_all(&header)?;
        for (_, data, _, _) in &self.entries {
            out.write_all(data)?;
        }
        out.flush()?;
        log::debug!("wrote {} tensors to {}", self.entries.len(), path.display());
        Ok(())
    }
}

// ── IC record ────────────────────────────────────────────────────────────────

/// Write `A`, `W`, `S`, the analysis scores and the keep/reject lists.
pub fn write_ic(ic: &IndependentComponents, verdict: &Verdict, path: &Path) -> Result<()> {
    let mut w = StWriter::new();
    w.add_f64_arr2("A", &ic.a);
    w.add_f64_arr2("W", &ic.w);
    w.add_signal("S", &ic.s);
    w.add_indices("keep", &verdict.keep);
    w.add_indices("reject", &verdict.reject);

    if let Some(c) = &ic.cumulant {
        w.add_f64("skew", &c.skew, &[c.skew.len()]);
        w.add_f64("kurt", &c.kurt, &[c.kurt.len()]);
        w.add_indices("cumulant_list", &c.list);
    }
    if let Some(c) = &ic.corr {
        for r in &c.references {
            w.add_f64(&format!("sigcorr_{}", r.name), &r.sig, &[r.sig.len()]);
            w.add_f64(&format!("powcorr_{}", r.name), &r.pow, &[r.pow.len()]);
        }
        w.add_indices("corr_list", &c.list);
    }
    if let Some(sp) = &ic.spectrum {
        w.add_f64_arr2("powspctrm", &sp.powspctrm);
        w.add_f64("freq", &sp.freq.to_vec(), &[sp.freq.len()]);
    }
    if let Some(sp) = &ic.spectral {
        w.add_f64_arr2("gof", &sp.gof);
        w.add_indices("spectral_list", &sp.list);
    }
    w.write(path)
}

/// Read back the decomposition written by [`write_ic`] together with its
/// reject list. Analysis scores are not restored.
pub fn load_ic(path: &Path) -> Result<(IndependentComponents, Vec<usize>)> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let st = SafeTensors::parse(&bytes)?;
    let a = st.matrix("A")?.context("missing 'A' key")?;
    let w = st.matrix("W")?.context("missing 'W' key")?;
    let s = st.signal("S")?.context("missing 'S' key")?;
    let reject = st.indices("reject")?;
    let ic = IndependentComponents::new(a, w, s)?;
    Ok((ic, reject))
}

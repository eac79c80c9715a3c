//! Recording metadata used for labels and sanity checks.
//!
//! The header is never transformed by the pipeline. Parsing it from an
//! acquisition file format is left to the caller.

/// Minimal measurement info: channel names and sampling rate.
#[derive(Debug, Clone, Default)]
pub struct MegHeader {
    /// One name per channel; may be empty when unknown.
    pub ch_names: Vec<String>,
    /// Sampling rate in Hz.
    pub sfreq: f64,
}

impl MegHeader {
    pub fn new(ch_names: Vec<String>, sfreq: f64) -> Self {
        Self { ch_names, sfreq }
    }

    /// Name of channel `idx`, falling back to a 1-based `ch{n}` label.
    pub fn channel_label(&self, idx: usize) -> String {
        self.ch_names
            .get(idx)
            .cloned()
            .unwrap_or_else(|| format!("ch{}", idx + 1))
    }

    /// Warn (but carry on) when the data does not look like it came from
    /// the expected acquisition system. Returns whether the count matched.
    pub fn check_channel_count(&self, n_channels: usize, expected: Option<usize>) -> bool {
        if !self.ch_names.is_empty() && self.ch_names.len() != n_channels {
            log::warn!(
                "header lists {} channel names but data has {n_channels} channels",
                self.ch_names.len()
            );
        }
        match expected {
            Some(n) if n != n_channels => {
                log::warn!(
                    "data has {n_channels} channels, expected {n}; it may not come from a \
                     Neuromag/Elekta MEG system"
                );
                false
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_falls_back_to_index() {
        let h = MegHeader::new(vec!["MEG0111".into()], 1000.0);
        assert_eq!(h.channel_label(0), "MEG0111");
        assert_eq!(h.channel_label(4), "ch5");
    }

    #[test]
    fn channel_count_check_is_advisory() {
        let h = MegHeader::default();
        assert!(h.check_channel_count(306, Some(306)));
        assert!(!h.check_channel_count(64, Some(306)));
        assert!(h.check_channel_count(64, None));
    }
}

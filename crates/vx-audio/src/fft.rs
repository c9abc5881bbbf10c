use rayon::prelude::*;
use realfft::RealFftPlanner;

/// FFT pipeline: windowed real FFT using realfft.
///
/// Pre-allocates the FFT plan and scratch buffers so repeated frames do not
/// allocate beyond the returned spectrum.
///
/// # Example
/// ```
/// use vx_audio::fft::FftPipeline;
/// let fft = FftPipeline::new(2048);
/// assert_eq!(fft.fft_size(), 2048);
/// ```
pub struct FftPipeline {
    fft_size: usize,
    input_buf: Vec<f32>,
    spectrum_buf: Vec<realfft::num_complex::Complex<f32>>,
    scratch: Vec<realfft::num_complex::Complex<f32>>,
    plan: std::sync::Arc<dyn realfft::RealToComplex<f32>>,
    /// Periodic Hann window coefficients.
    window: Vec<f32>,
}

impl FftPipeline {
    /// Create a new FFT pipeline with the given window size.
    ///
    /// # Panics
    /// Panics if `size` is 0.
    #[must_use]
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "FFT size must be > 0");

        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(size);

        let input_buf = plan.make_input_vec();
        let spectrum_buf = plan.make_output_vec();
        let scratch = plan.make_scratch_vec();

        let window: Vec<f32> = (0..size)
            .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / size as f32).cos()))
            .collect();

        Self {
            fft_size: size,
            input_buf,
            spectrum_buf,
            scratch,
            plan,
            window,
        }
    }

    /// Process `samples` through the windowed FFT.
    ///
    /// Short input is zero-padded. Returns the magnitude spectrum (N/2+1 bins).
    ///
    /// # Example
    /// ```
    /// use vx_audio::fft::FftPipeline;
    /// let mut fft = FftPipeline::new(256);
    /// let spectrum = fft.process(&vec![0.0f32; 256]);
    /// assert_eq!(spectrum.len(), 129); // N/2 + 1
    /// ```
    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        let n = self.fft_size.min(samples.len());

        for (i, slot) in self.input_buf.iter_mut().enumerate() {
            *slot = if i < n {
                samples[i] * self.window[i]
            } else {
                0.0
            };
        }

        if self
            .plan
            .process_with_scratch(&mut self.input_buf, &mut self.spectrum_buf, &mut self.scratch)
            .is_err()
        {
            return vec![0.0; self.spectrum_buf.len()];
        }

        self.spectrum_buf.iter().map(|c| c.norm()).collect()
    }

    /// FFT window size.
    #[must_use]
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }
}

/// Number of centred frames for a signal of `len` samples.
#[must_use]
pub fn frame_count(len: usize, hop: usize) -> usize {
    if len == 0 || hop == 0 {
        return 0;
    }
    1 + len / hop
}

/// Frame `index` of a signal centred on `index * hop`, zero-padded at both edges.
#[must_use]
pub fn centered_frame(samples: &[f32], index: usize, frame_len: usize, hop: usize) -> Vec<f32> {
    let center = (index * hop) as isize;
    let start = center - (frame_len / 2) as isize;
    (0..frame_len as isize)
        .map(|i| {
            let pos = start + i;
            if pos >= 0 && (pos as usize) < samples.len() {
                samples[pos as usize]
            } else {
                0.0
            }
        })
        .collect()
}

/// Magnitude short-time Fourier transform of a whole signal.
#[derive(Clone, Debug)]
pub struct Spectrogram {
    /// `frames[t][k]`: magnitude of bin `k` in frame `t`.
    pub frames: Vec<Vec<f32>>,
    pub sample_rate: u32,
    pub n_fft: usize,
    pub hop: usize,
}

impl Spectrogram {
    /// Compute the centred STFT of `samples`, frames in parallel.
    ///
    /// # Example
    /// ```
    /// use vx_audio::fft::Spectrogram;
    /// let spec = Spectrogram::compute(&vec![0.0; 16_000], 16_000, 2048, 512);
    /// assert_eq!(spec.n_frames(), 32);
    /// assert_eq!(spec.n_bins(), 1025);
    /// ```
    #[must_use]
    pub fn compute(samples: &[f32], sample_rate: u32, n_fft: usize, hop: usize) -> Self {
        let n_frames = frame_count(samples.len(), hop);
        let frames = (0..n_frames)
            .into_par_iter()
            .map_init(
                || FftPipeline::new(n_fft),
                |fft, t| fft.process(&centered_frame(samples, t, n_fft, hop)),
            )
            .collect();

        Self {
            frames,
            sample_rate,
            n_fft,
            hop,
        }
    }

    #[must_use]
    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn n_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Centre frequency of bin `k` in Hz.
    #[inline]
    #[must_use]
    pub fn bin_hz(&self, k: usize) -> f32 {
        k as f32 * self.sample_rate as f32 / self.n_fft as f32
    }

    /// Frame rate of the spectrogram in frames per second.
    #[must_use]
    pub fn frame_rate(&self) -> f32 {
        self.sample_rate as f32 / self.hop as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_peaks_at_its_bin() {
        let sr = 16_000u32;
        let n = 1024usize;
        let freq = 1000.0f32;
        let samples: Vec<f32> = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin())
            .collect();
        let mut fft = FftPipeline::new(n);
        let spectrum = fft.process(&samples);
        let peak = spectrum
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(k, _)| k)
            .expect("non-empty");
        assert_eq!(peak, (freq * n as f32 / sr as f32).round() as usize);
    }

    #[test]
    fn centered_frames_pad_edges() {
        let samples = [1.0f32, 2.0, 3.0, 4.0];
        let first = centered_frame(&samples, 0, 4, 2);
        assert_eq!(first, vec![0.0, 0.0, 1.0, 2.0]);
        let last = centered_frame(&samples, 2, 4, 2);
        assert_eq!(last, vec![3.0, 4.0, 0.0, 0.0]);
        assert_eq!(frame_count(4, 2), 3);
        assert_eq!(frame_count(0, 2), 0);
    }
}

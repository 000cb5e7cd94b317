//! Writes synthetic instrument exports for trying out the cache.
//!
//! Each file holds a few samples with two fluorophore peaks, first and
//! second order Rayleigh ridges and noise.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Fluorophore peak: (excitation centre, emission centre, width, amplitude).
type Peak = (f64, f64, f64, f64);

fn intensity(ex: f64, em: f64, peaks: &[Peak], noise: f64, rng: &mut SimpleRng) -> f64 {
    let fluorescence: f64 = peaks
        .iter()
        .map(|&(ex0, em0, sigma, amp)| {
            gaussian(ex, ex0, sigma, 1.0) * gaussian(em, em0, sigma, amp)
        })
        .sum();
    let scatter = gaussian(em, ex, 4.0, 5.0) + gaussian(em, 2.0 * ex, 6.0, 1.5);
    (fluorescence + scatter + rng.gauss(0.0, noise)).max(0.0)
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Generate synthetic EEM exports
#[derive(Parser)]
#[command(name = "generate_sample")]
struct Cli {
    /// Output directory
    #[arg(value_name = "DIR", default_value = "sample_data")]
    dir: PathBuf,

    /// Number of export files
    #[arg(short, long, default_value = "2")]
    files: usize,

    #[arg(long, default_value = "42")]
    seed: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut rng = SimpleRng::new(cli.seed);
    std::fs::create_dir_all(&cli.dir)
        .with_context(|| format!("Failed to create {}", cli.dir.display()))?;

    // Excitation 240..=400 step 10, emission 250..=600 step 2.
    let excitation: Vec<i32> = (240..=400).step_by(10).collect();
    let emission: Vec<i32> = (250..=600).step_by(2).collect();

    let samples: [(&str, Vec<Peak>); 3] = [
        ("Humic", vec![(250.0, 450.0, 30.0, 1.2), (340.0, 440.0, 25.0, 0.8)]),
        ("Protein", vec![(275.0, 340.0, 15.0, 1.5)]),
        ("Blank", vec![]),
    ];

    for file_index in 0..cli.files {
        let path = cli.dir.join(format!("run{}.csv", file_index + 1));
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;

        let mut header = vec!["Wavelength".to_string()];
        let mut units = vec!["nm".to_string()];
        for (name, _) in &samples {
            for ex in &excitation {
                header.push(format!("{name}_EX_{ex}"));
                units.push("Intensity (a.u.)".to_string());
            }
        }
        writer.write_record(&header)?;
        writer.write_record(&units)?;

        let scale = 1.0 + file_index as f64 * 0.25;
        for &em in &emission {
            let mut row = vec![em.to_string()];
            for (_, peaks) in &samples {
                let scaled: Vec<Peak> = peaks
                    .iter()
                    .map(|&(ex0, em0, sigma, amp)| (ex0, em0, sigma, amp * scale))
                    .collect();
                for &ex in &excitation {
                    let value = intensity(ex as f64, em as f64, &scaled, 0.01, &mut rng);
                    row.push(format!("{value:.5}"));
                }
            }
            writer.write_record(&row)?;
        }
        writer.flush()?;
        drop(writer);

        // Instrument trailer after the data block.
        let mut text = std::fs::read_to_string(&path)?;
        text.push_str("\nMethod,Synthetic 3D scan\nPMT voltage,600\n");
        std::fs::write(&path, text)?;

        println!(
            "Wrote {} ({} samples, {} x {})",
            path.display(),
            samples.len(),
            excitation.len(),
            emission.len()
        );
    }
    Ok(())
}

use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

fn generate_spectrum(
    wavelengths: &[f64],
    lines: &[(f64, f64, f64)],
    scale: f64,
    noise_level: f64,
    noise: &mut NoiseSource,
) -> Vec<f64> {
    wavelengths
        .iter()
        .map(|&wl| {
            let signal: f64 = lines
                .iter()
                .map(|&(mu, sigma, amp)| gaussian(wl, mu, sigma, amp * scale))
                .sum();
            signal + noise.normal(noise_level)
        })
        .collect()
}

/// SplitMix64 generator with Box-Muller normals.
struct NoiseSource {
    state: u64,
    /// Second Box-Muller sample, handed out on the next call.
    spare: Option<f64>,
}

impl NoiseSource {
    fn new(seed: u64) -> Self {
        NoiseSource { state: seed, spare: None }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    /// Uniform in (0, 1].
    fn unit(&mut self) -> f64 {
        ((self.next_u64() >> 11) + 1) as f64 / (1u64 << 53) as f64
    }

    /// Normal deviate with the given spread.
    fn normal(&mut self, std_dev: f64) -> f64 {
        if let Some(z) = self.spare.take() {
            return std_dev * z;
        }
        let radius = (-2.0 * self.unit().ln()).sqrt();
        let angle = 2.0 * std::f64::consts::PI * self.unit();
        self.spare = Some(radius * angle.sin());
        std_dev * radius * angle.cos()
    }
}

/// Document layout read by `cube-pack`.
#[derive(Serialize)]
struct SampleCube {
    wavelengths: Vec<f64>,
    /// fluxes[lat][lon][wavelength]
    fluxes: Vec<Vec<Vec<f64>>>,
}

/// Write a synthetic H2 emission cube JSON file.
#[derive(Parser, Debug)]
#[command(name = "generate_sample")]
struct Cli {
    /// Output JSON path
    #[arg(default_value = "sample_h2_emission_cube.json")]
    output: PathBuf,

    /// Number of spatial pixels along each axis
    #[arg(long, default_value_t = 8)]
    pixels: usize,

    /// Number of wavelength samples
    #[arg(long, default_value_t = 500)]
    samples: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut noise = NoiseSource::new(cli.seed);

    // Far-UV band, 1350 → 1650 Å
    let step = 300.0 / cli.samples.max(1) as f64;
    let wavelengths: Vec<f64> = (0..cli.samples).map(|i| 1350.0 + i as f64 * step).collect();

    // Fluorescent H2 Lyman band features: (centre Å, width Å, amplitude)
    let lines = [
        (1431.0, 1.5, 0.6),
        (1446.0, 1.5, 0.8),
        (1489.0, 2.0, 0.5),
        (1504.0, 1.5, 0.7),
        (1524.0, 2.0, 0.4),
        (1577.0, 3.0, 1.0),
        (1608.0, 4.0, 0.9),
    ];

    // Emission falls off away from the centre of the field.
    let centre = (cli.pixels as f64 - 1.0) / 2.0;
    let mut fluxes = Vec::with_capacity(cli.pixels);
    for lat in 0..cli.pixels {
        let mut row = Vec::with_capacity(cli.pixels);
        for lon in 0..cli.pixels {
            let r2 = (lat as f64 - centre).powi(2) + (lon as f64 - centre).powi(2);
            let scale = (-r2 / (2.0 * (centre + 1.0).powi(2))).exp();
            row.push(generate_spectrum(&wavelengths, &lines, scale, 0.01, &mut noise));
        }
        fluxes.push(row);
    }

    let cube = SampleCube {
        wavelengths,
        fluxes,
    };
    let file = std::fs::File::create(&cli.output)
        .with_context(|| format!("creating {}", cli.output.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &cube)
        .with_context(|| format!("writing {}", cli.output.display()))?;
    writer.flush().context("flushing output")?;

    println!(
        "Wrote {0} x {0} pixels ({1} wavelengths each) to {2}",
        cli.pixels,
        cli.samples,
        cli.output.display()
    );
    Ok(())
}

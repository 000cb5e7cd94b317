#![allow(dead_code)]

use std::error::Error;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

pub const EXCITATION: [i32; 3] = [250, 260, 270];
pub const EMISSION: [i32; 4] = [300, 310, 320, 330];

/// Intensity written for sample `s` at (`ex`, `em`).
pub fn intensity(s: usize, ex: i32, em: i32) -> f32 {
    (s * 1000) as f32 + (ex - 250) as f32 + (em - 300) as f32 / 100.0
}

/// Write an inline-layout export holding `samples` over the fixture axes,
/// with a units row and an instrument trailer, and set its modification
/// time to `age` seconds after the epoch of the fixtures.
pub fn write_export(
    dir: &Path,
    file: &str,
    samples: &[&str],
    age: u64,
) -> Result<PathBuf, Box<dyn Error>> {
    let mut text = String::from("Wavelength");
    let mut units = String::from("nm");
    for sample in samples {
        for ex in EXCITATION {
            text.push_str(&format!(",{sample}_EX_{ex}"));
            units.push_str(",a.u.");
        }
    }
    text.push('\n');
    text.push_str(&units);
    text.push('\n');
    for em in EMISSION {
        text.push_str(&em.to_string());
        for (s, _) in samples.iter().enumerate() {
            for ex in EXCITATION {
                text.push_str(&format!(",{}", intensity(s, ex, em)));
            }
        }
        text.push('\n');
    }
    text.push_str("\nMethod,3D scan\n");

    let path = dir.join(file);
    std::fs::write(&path, text)?;
    set_age(&path, age)?;
    Ok(path)
}

pub fn set_age(path: &Path, age: u64) -> Result<(), Box<dyn Error>> {
    let time = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + age);
    File::options().write(true).open(path)?.set_modified(time)?;
    Ok(())
}

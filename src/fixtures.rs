//! Synthetic reads shared by the engine tests

use std::path::Path;

use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::{FileFormat, Result, SequenceReader, SequenceRecord, SequenceWriter};

const BASES: &[u8; 4] = b"ACGT";

/// Random reads named `<prefix>_<i>` with Sanger qualities
pub fn random_records(n: usize, prefix: &str, seed: u64) -> Vec<SequenceRecord> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let len = rng.random_range(40..120);
            let sequence: Vec<u8> = (0..len).map(|_| BASES[rng.random_range(0..4)]).collect();
            let quality: Vec<u8> = (0..len).map(|_| rng.random_range(b'#'..=b'J')).collect();
            SequenceRecord::new(format!("{prefix}_{i}"), sequence).with_quality(quality)
        })
        .collect()
}

/// Writes `records` to `path` in the format implied by its extension
pub fn write_records(path: &Path, records: &[SequenceRecord]) -> Result<()> {
    let mut writer = SequenceWriter::create(path, FileFormat::from_path(path)?)?;
    for record in records {
        writer.write(record)?;
    }
    writer.finish()
}

/// Reads every record of `path` in the format implied by its extension
pub fn read_records(path: &Path) -> Result<Vec<SequenceRecord>> {
    SequenceReader::open(path, FileFormat::from_path(path)?)?.collect()
}

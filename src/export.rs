use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

use crate::models::{Result, ScoreResult};

pub const EXPORT_HEADER: [&str; 2] = ["Name", "Points"];

/// Writes results in the order given, one row per player.
pub fn write_results_csv<W: Write>(writer: W, results: &[ScoreResult]) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(EXPORT_HEADER)?;
    for result in results {
        out.write_record([result.name.as_str(), &result.total_points.to_string()])?;
    }
    out.flush()?;
    Ok(())
}

pub fn export_results(path: impl AsRef<Path>, results: &[ScoreResult]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    write_results_csv(BufWriter::new(file), results)?;
    info!("Exported {} results to {}", results.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use csv::ReaderBuilder;

    #[test]
    fn test_header_and_rows() {
        let mut buf = Vec::new();
        write_results_csv(
            &mut buf,
            &[ScoreResult::new("B", 80), ScoreResult::new("Smith, Jr.", -3)],
        )
        .unwrap();

        let mut reader = ReaderBuilder::new().from_reader(buf.as_slice());
        assert_eq!(reader.headers().unwrap().iter().collect::<Vec<_>>(), vec!["Name", "Points"]);

        let rows: Vec<Vec<String>> = reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect();
        assert_eq!(rows, vec![vec!["B", "80"], vec!["Smith, Jr.", "-3"]]);
    }

    #[test]
    fn test_empty_results_still_have_header() {
        let mut buf = Vec::new();
        write_results_csv(&mut buf, &[]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "Name,Points\n");
    }

    #[test]
    fn test_export_to_file() {
        let path = std::env::temp_dir().join(format!("cwl_bonus_export_{}.csv", std::process::id()));
        export_results(&path, &[ScoreResult::new("A", 50)]).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(written, "Name,Points\nA,50\n");
    }
}

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

use super::client::{FetchRequest, RosterSource};
use crate::models::{AcquisitionError, RawPlayer};

/// Reads a raw roster from a JSON array in the scoring service's flat player
/// shape. The clan tag and API key of the request are not used.
pub struct FileRosterSource {
    path: PathBuf,
}

impl FileRosterSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RosterSource for FileRosterSource {
    async fn fetch_roster(&self, _request: &FetchRequest) -> Result<Vec<RawPlayer>, AcquisitionError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let players: Vec<RawPlayer> = serde_json::from_str(&raw)?;
        info!("Read {} players from {}", players.len(), self.path.display());
        Ok(players)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_sparse_roster_file() {
        let path = std::env::temp_dir().join(format!("cwl_bonus_raw_{}.json", std::process::id()));
        tokio::fs::write(
            &path,
            r#"[{"Name":"Alice","Eigenes_Rathaus":13,"Tag1_Sterne":2},{"Name":"Bob"}]"#,
        )
        .await
        .unwrap();

        let players = FileRosterSource::new(&path)
            .fetch_roster(&FetchRequest::default())
            .await
            .unwrap();
        let _ = tokio::fs::remove_file(&path).await;

        assert_eq!(players.len(), 2);
        assert_eq!(players[0].own_town_hall_level, Some(13));
        assert_eq!(players[0].days[&1].stars, Some(2));
        assert!(players[1].days.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_an_acquisition_error() {
        let result = FileRosterSource::new("/definitely/not/here.json")
            .fetch_roster(&FetchRequest::default())
            .await;
        assert!(matches!(result, Err(AcquisitionError::Io(_))));
    }
}

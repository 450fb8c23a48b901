use markerlink_core::{
    error::{ReplayOpenSnafu, ReplayParseSnafu, ReplayReadSnafu},
    prelude::*,
};
use snafu::ResultExt;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};

use super::DetectionSource;
use crate::pose::Detection;

/// Plays back detection frames recorded as JSON lines
///
/// Each line is one frame: a JSON array of `{"id": .., "rvec": [..], "tvec": [..]}`.
/// Blank lines are skipped.
pub struct ReplaySource<R> {
    lines: Lines<BufReader<R>>,
    line_no: usize,
}
impl ReplaySource<tokio::fs::File> {
    pub async fn open(path: &str) -> Result<Self, Error> {
        let file = tokio::fs::File::open(path)
            .await
            .context(ReplayOpenSnafu { path })?;
        Ok(Self::from_reader(file))
    }
}
impl<R: AsyncRead + Unpin> ReplaySource<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
            line_no: 0,
        }
    }
}
impl<R: AsyncRead + Unpin> DetectionSource for ReplaySource<R> {
    async fn next_frame(&mut self) -> Result<Option<Vec<Detection>>, Error> {
        while let Some(line) = self.lines.next_line().await.context(ReplayReadSnafu)? {
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }

            let dets = serde_json::from_str(&line).context(ReplayParseSnafu {
                line: self.line_no,
            })?;
            return Ok(Some(dets));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    const RECORDING: &str = r#"[{"id": 3, "rvec": [0, 0, 0], "tvec": [0, 0, 0.4]}]

[]
not json
[{"id": 0, "rvec": [0, 0.5, 0], "tvec": [0.1, 0, 0.5]}, {"id": 3, "rvec": [0, 0, 0], "tvec": [0, 0, 0.4]}]
"#;

    #[tokio::test]
    async fn plays_back_frames() -> Result<()> {
        let mut src = ReplaySource::from_reader(RECORDING.as_bytes());

        let first = src.next_frame().await?.unwrap();
        assert_eq!(first, vec![Detection::new(3, [0.0; 3], [0.0, 0.0, 0.4])]);

        assert_eq!(src.next_frame().await?, Some(vec![]));

        // One bad line doesn't end the recording
        assert!(matches!(
            src.next_frame().await,
            Err(Error::ReplayParse { line: 4, .. })
        ));

        let last = src.next_frame().await?.unwrap();
        assert_eq!(last.len(), 2);
        assert_eq!(last[0].rvec, [0.0, 0.5, 0.0]);

        assert_eq!(src.next_frame().await?, None);
        assert_eq!(src.next_frame().await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn missing_file() {
        assert!(matches!(
            ReplaySource::<tokio::fs::File>::open("/no/such/recording.jsonl").await,
            Err(Error::ReplayOpen { .. })
        ));
    }
}

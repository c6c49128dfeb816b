//! Streaming HTTP download with atomic rename
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::error::{Error, Result};

/// Temporary sibling of `path` used while the download is in flight.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Stream `url` to `path`.
///
/// The body is written to a `.tmp` sibling and renamed into place at the end,
/// so a partial download is never observable at `path`. With `executable` set
/// the file is chmod 0755 before the rename (unix only).
pub async fn download_to_path(url: &Url, path: &Path, executable: bool) -> Result<()> {
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .build()
        .map_err(|source| Error::Download {
            url: url.to_string(),
            source,
        })?;

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|source| Error::Download {
            url: url.to_string(),
            source,
        })?;

    if !response.status().is_success() {
        return Err(Error::DownloadStatus {
            url: url.to_string(),
            status: response.status(),
        });
    }

    let tmp = staging_path(path);
    let io_err = |source| Error::Io {
        path: tmp.clone(),
        source,
    };

    let mut file = tokio::fs::File::create(&tmp).await.map_err(io_err)?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|source| Error::Download {
            url: url.to_string(),
            source,
        })?;
        file.write_all(&chunk).await.map_err(io_err)?;
    }
    file.flush().await.map_err(io_err)?;
    drop(file);

    #[cfg(unix)]
    if executable {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o755))
            .await
            .map_err(io_err)?;
    }
    #[cfg(not(unix))]
    let _ = executable;

    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
}

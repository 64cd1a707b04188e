//! Media fetcher: turns chat uploads and YouTube links into local files.
//!
//! A file that already exists in the music directory is never fetched again;
//! existence on disk is the sole idempotence signal. After any actual
//! download the player daemon is asked to rescan, and the fetch only returns
//! once the rescan finished, so the file is visible to the library index by
//! the time the caller enqueues it.

use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{Audio, Document};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::BotError;
use crate::player::PlayerClient;

static VIDEO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(www\.)?youtu(\.be|be\.com)/").expect("hard-coded pattern")
});

/// Whether a URL points at a recognized video host. Checked before any fetch
/// is attempted.
pub fn is_supported_video_url(url: &str) -> bool {
    VIDEO_URL.is_match(url)
}

/// Metadata of a shared file, reduced to what filename derivation needs.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_id: String,
    pub file_name: Option<String>,
    pub performer: Option<String>,
    pub title: Option<String>,
}

impl Upload {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            file_id: doc.file.id.clone(),
            file_name: doc.file_name.clone(),
            performer: None,
            title: None,
        }
    }

    pub fn from_audio(audio: &Audio) -> Self {
        Self {
            file_id: audio.file.id.clone(),
            file_name: audio.file_name.clone(),
            performer: audio.performer.clone(),
            title: audio.title.clone(),
        }
    }
}

/// Derive the destination filename for an upload.
///
/// Priority: the upload's own filename, then "performer - title.mp3",
/// "performer.mp3", "title.mp3". An upload with none of these fails the
/// fetch.
pub fn derive_filename(upload: &Upload) -> Result<String, BotError> {
    if let Some(name) = upload.file_name.as_deref().filter(|n| !n.is_empty()) {
        return Ok(name.to_string());
    }
    match (&upload.performer, &upload.title) {
        (Some(performer), Some(title)) => Ok(format!("{performer} - {title}.mp3")),
        (Some(performer), None) => Ok(format!("{performer}.mp3")),
        (None, Some(title)) => Ok(format!("{title}.mp3")),
        (None, None) => Err(BotError::Fetch(
            "upload has no filename, performer or title".to_string(),
        )),
    }
}

/// Downloads media into the music directory.
#[derive(Debug, Clone)]
pub struct MediaFetcher {
    music_dir: PathBuf,
    player: PlayerClient,
}

impl MediaFetcher {
    pub fn new(music_dir: PathBuf, player: PlayerClient) -> Self {
        Self { music_dir, player }
    }

    /// Fetch a file shared in the chat, returning its local path.
    pub async fn fetch_from_upload(&self, bot: &Bot, upload: Upload) -> Result<PathBuf, BotError> {
        let filename = derive_filename(&upload)?;
        let dest = self.music_dir.join(&filename);
        if dest.is_file() {
            debug!("{} already present, skipping download", dest.display());
            return Ok(dest);
        }

        info!("Downloading shared file to {}", dest.display());
        if let Err(err) = download_upload(bot, &upload.file_id, &dest).await {
            // A half-written file must never satisfy the existence check of
            // a later fetch.
            let _ = tokio::fs::remove_file(&dest).await;
            return Err(err);
        }
        info!("Downloaded shared file");

        self.player.rescan_and_wait().await?;
        Ok(dest)
    }

    /// Fetch the best audio track of a video URL, returning its local path.
    pub async fn fetch_from_url(&self, url: &str) -> Result<PathBuf, BotError> {
        if !is_supported_video_url(url) {
            return Err(BotError::Fetch(format!("unsupported URL: {url}")));
        }

        // Probe and download share the template, so the probed filename is
        // exactly what the download will write, sanitization included.
        let template = self.music_dir.join("%(title)s.%(ext)s");
        let dest = probe_url(url, &template).await?;
        if dest.is_file() {
            debug!("{} already present, skipping download", dest.display());
            return Ok(dest);
        }

        info!("Downloading {} to {}", url, dest.display());
        download_url(url, &template).await?;
        info!("Downloaded file from {url}");

        self.player.rescan_and_wait().await?;
        Ok(dest)
    }

    /// Database-relative URI of a fetched file, as the daemon expects it in
    /// `addid`. Absolute paths are rejected by TCP clients.
    pub fn library_uri(&self, path: &Path) -> Result<String, BotError> {
        path.strip_prefix(&self.music_dir)
            .map(|relative| relative.to_string_lossy().into_owned())
            .map_err(|_| {
                BotError::Fetch(format!(
                    "{} is outside the music directory",
                    path.display()
                ))
            })
    }
}

async fn download_upload(bot: &Bot, file_id: &str, dest: &Path) -> Result<(), BotError> {
    let mut output = tokio::fs::File::create(dest).await?;
    let file = bot.get_file(file_id.to_string()).await?;
    bot.download_file(&file.path, &mut output).await?;
    output.flush().await?;
    Ok(())
}

/// Metadata yt-dlp reports for the best-audio format. `filename` is the
/// output name computed from the template, sanitization included.
#[derive(Debug, Deserialize)]
struct ProbedMedia {
    #[serde(alias = "_filename")]
    filename: PathBuf,
}

async fn probe_url(url: &str, template: &Path) -> Result<PathBuf, BotError> {
    let output = Command::new("yt-dlp")
        .args(["--no-playlist", "-f", "bestaudio/best", "-J", "-o"])
        .arg(template)
        .arg(url)
        .output()
        .await?;
    if !output.status.success() {
        return Err(BotError::Fetch(format!(
            "yt-dlp probe failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    let probe: ProbedMedia = serde_json::from_slice(&output.stdout)
        .map_err(|e| BotError::Fetch(format!("unreadable yt-dlp metadata: {e}")))?;
    Ok(probe.filename)
}

async fn download_url(url: &str, template: &Path) -> Result<(), BotError> {
    let output = Command::new("yt-dlp")
        .args(["--no-playlist", "-f", "bestaudio/best", "-o"])
        .arg(template)
        .arg(url)
        .output()
        .await?;
    if !output.status.success() {
        return Err(BotError::Fetch(format!(
            "yt-dlp download failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn upload(
        file_name: Option<&str>,
        performer: Option<&str>,
        title: Option<&str>,
    ) -> Upload {
        Upload {
            file_id: "file-id".to_string(),
            file_name: file_name.map(str::to_string),
            performer: performer.map(str::to_string),
            title: title.map(str::to_string),
        }
    }

    #[test]
    fn own_filename_wins() {
        let u = upload(Some("track.ogg"), Some("P"), Some("T"));
        assert_eq!(derive_filename(&u).unwrap(), "track.ogg");
    }

    #[test]
    fn performer_and_title_combine() {
        let u = upload(None, Some("P"), Some("T"));
        assert_eq!(derive_filename(&u).unwrap(), "P - T.mp3");
    }

    #[test]
    fn performer_or_title_alone_suffice() {
        assert_eq!(derive_filename(&upload(None, Some("P"), None)).unwrap(), "P.mp3");
        assert_eq!(derive_filename(&upload(None, None, Some("T"))).unwrap(), "T.mp3");
    }

    #[test]
    fn no_metadata_is_an_error() {
        assert!(matches!(
            derive_filename(&upload(None, None, None)),
            Err(BotError::Fetch(_))
        ));
    }

    #[test]
    fn empty_filename_falls_through_to_tags() {
        let u = upload(Some(""), None, Some("T"));
        assert_eq!(derive_filename(&u).unwrap(), "T.mp3");
    }

    #[test]
    fn recognizes_youtube_urls() {
        assert!(is_supported_video_url("https://www.youtube.com/watch?v=x"));
        assert!(is_supported_video_url("https://youtube.com/watch?v=x"));
        assert!(is_supported_video_url("http://youtu.be/x"));
        assert!(is_supported_video_url("https://youtu.be/x"));
    }

    #[test]
    fn rejects_other_hosts() {
        assert!(!is_supported_video_url("https://vimeo.com/12345"));
        assert!(!is_supported_video_url("https://notyoutube.com/watch"));
        assert!(!is_supported_video_url("ftp://youtube.com/x"));
        assert!(!is_supported_video_url("just a sentence about youtube.com/"));
    }

    #[tokio::test]
    async fn existing_file_short_circuits_the_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("song.mp3");
        std::fs::write(&dest, b"x").unwrap();

        // Unreachable daemon and an unusable bot: neither may be contacted
        // when the destination already exists.
        let player = PlayerClient::new(
            "127.0.0.1:1",
            Duration::from_millis(50),
            Duration::from_millis(50),
        );
        let fetcher = MediaFetcher::new(dir.path().to_path_buf(), player);
        let bot = Bot::new("0:offline");

        let got = fetcher
            .fetch_from_upload(&bot, upload(Some("song.mp3"), None, None))
            .await
            .unwrap();
        assert_eq!(got, dest);
    }

    #[tokio::test]
    async fn failed_download_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let player = PlayerClient::new(
            "127.0.0.1:1",
            Duration::from_millis(50),
            Duration::from_millis(50),
        );
        let fetcher = MediaFetcher::new(dir.path().to_path_buf(), player);
        // Unreachable API: the transfer fails after the destination file was
        // created.
        let bot = Bot::new("0:offline")
            .set_api_url(url::Url::parse("http://127.0.0.1:9/").unwrap());

        let result = fetcher
            .fetch_from_upload(&bot, upload(Some("song.mp3"), None, None))
            .await;
        assert!(result.is_err());
        assert!(!dir.path().join("song.mp3").exists());
    }

    #[test]
    fn library_uri_is_relative_to_the_music_directory() {
        let player = PlayerClient::new(
            "127.0.0.1:1",
            Duration::from_millis(50),
            Duration::from_millis(50),
        );
        let fetcher = MediaFetcher::new(PathBuf::from("/srv/music"), player);

        assert_eq!(
            fetcher
                .library_uri(Path::new("/srv/music/fancy_song.mp3"))
                .unwrap(),
            "fancy_song.mp3"
        );
        assert!(matches!(
            fetcher.library_uri(Path::new("/tmp/elsewhere.mp3")),
            Err(BotError::Fetch(_))
        ));
    }

    #[test]
    fn probe_metadata_uses_the_computed_filename() {
        // yt-dlp sanitizes reserved characters, so the computed name can
        // differ from "{title}.{ext}".
        let probe: ProbedMedia = serde_json::from_str(
            r#"{"title": "a/b: c?", "ext": "webm", "filename": "/srv/music/a⧸b： c？.webm"}"#,
        )
        .unwrap();
        assert_eq!(probe.filename, PathBuf::from("/srv/music/a⧸b： c？.webm"));

        let legacy: ProbedMedia =
            serde_json::from_str(r#"{"_filename": "/srv/music/plain.opus"}"#).unwrap();
        assert_eq!(legacy.filename, PathBuf::from("/srv/music/plain.opus"));
    }
}

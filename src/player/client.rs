//! Short-lived connection wrapper around the MPD protocol.
//!
//! Every operation opens its own connection, runs one or more protocol
//! commands and drops the connection on every exit path. Nothing is held
//! across handler invocations and nothing is retried: a daemon call either
//! succeeds or the whole command fails.

use mpd::{Client, Idle, Song, Status, Subsystem};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use crate::errors::BotError;

/// Handle to the configured MPD instance.
///
/// Cheap to clone; holds only the address and timeouts, never a connection.
#[derive(Debug, Clone)]
pub struct PlayerClient {
    address: String,
    timeout: Duration,
    idle_timeout: Duration,
}

impl PlayerClient {
    pub fn new(address: &str, timeout: Duration, idle_timeout: Duration) -> Self {
        Self {
            address: address.to_string(),
            timeout,
            idle_timeout,
        }
    }

    /// Open a connection with the given read timeout.
    fn connect(&self, read_timeout: Duration) -> Result<Client, BotError> {
        debug!("Connecting to MPD at {}", self.address);
        let addr = self
            .address
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                BotError::Configuration(format!("cannot resolve MPD address {}", self.address))
            })?;
        let stream = TcpStream::connect_timeout(&addr, self.timeout)?;
        stream.set_read_timeout(Some(read_timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;
        Ok(Client::new(stream)?)
    }

    /// Run a closure against a fresh connection on the blocking pool.
    ///
    /// The connection is dropped, and thereby closed, whether the closure
    /// succeeds or fails.
    async fn with_client<T, F>(&self, read_timeout: Duration, op: F) -> Result<T, BotError>
    where
        F: FnOnce(&mut Client) -> Result<T, mpd::error::Error> + Send + 'static,
        T: Send + 'static,
    {
        let this = self.clone();
        tokio::task::spawn_blocking(move || {
            let mut client = this.connect(read_timeout)?;
            op(&mut client).map_err(BotError::from)
        })
        .await?
    }

    /// Clear the playback queue.
    pub async fn clear(&self) -> Result<(), BotError> {
        self.with_client(self.timeout, |c| c.clear()).await
    }

    /// Skip the current track.
    pub async fn skip(&self) -> Result<(), BotError> {
        self.with_client(self.timeout, |c| c.next()).await
    }

    /// Start playback with consume mode enabled, so played songs are removed
    /// from the queue.
    pub async fn play(&self) -> Result<(), BotError> {
        self.with_client(self.timeout, |c| {
            c.consume(true)?;
            c.play()
        })
        .await
    }

    /// Stop playback.
    pub async fn stop(&self) -> Result<(), BotError> {
        self.with_client(self.timeout, |c| c.stop()).await
    }

    /// Fetch the currently playing song, if any.
    pub async fn current_song(&self) -> Result<Option<Song>, BotError> {
        self.with_client(self.timeout, |c| c.currentsong()).await
    }

    /// Fetch the daemon status.
    pub async fn status(&self) -> Result<Status, BotError> {
        self.with_client(self.timeout, |c| c.status()).await
    }

    /// Fetch the first `limit` queue entries.
    pub async fn upcoming(&self, limit: u32) -> Result<Vec<Song>, BotError> {
        self.with_client(self.timeout, move |c| c.songs(0..limit))
            .await
    }

    /// Trigger a library rescan and block until the daemon reports that the
    /// database finished changing.
    ///
    /// If the notification never arrives the read timeout (`idle_timeout`)
    /// fails the connection and the error propagates to the caller.
    pub async fn rescan_and_wait(&self) -> Result<(), BotError> {
        self.with_client(self.idle_timeout, |c| {
            debug!("Triggering library rescan");
            c.update()?;
            debug!("Waiting for database update to complete");
            c.wait(&[Subsystem::Database])?;
            Ok(())
        })
        .await
    }

    /// Rescan, wait for completion, append `uri` to the queue and report the
    /// resulting queue length. Runs in a single daemon session.
    ///
    /// `uri` must be relative to the daemon's music directory; the daemon
    /// rejects absolute paths from TCP clients.
    pub async fn enqueue(&self, uri: &str) -> Result<u32, BotError> {
        let uri = uri.to_string();
        self.with_client(self.idle_timeout, move |c| {
            c.update()?;
            c.wait(&[Subsystem::Database])?;
            let id = c.push(Song {
                file: uri.clone(),
                ..Song::default()
            })?;
            debug!("Song {} queued with id {:?}", uri, id);
            Ok(c.status()?.queue_len)
        })
        .await
    }

    /// Storage path of the daemon's first mount.
    pub async fn music_directory(&self) -> Result<PathBuf, BotError> {
        self.with_client(self.timeout, |c| c.mounts())
            .await?
            .into_iter()
            .next()
            .map(|mount| PathBuf::from(mount.storage))
            .ok_or_else(|| {
                BotError::Configuration("player daemon reports no mounts".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::{Arc, Mutex};

    /// Minimal MPD stand-in: accepts one connection, answers the handful of
    /// commands the enqueue session issues, and records every command line.
    fn fake_daemon() -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = format!("127.0.0.1:{}", listener.local_addr().unwrap().port());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);

        std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut writer = stream.try_clone().unwrap();
            let mut reader = BufReader::new(stream);
            writer.write_all(b"OK MPD 0.23.5\n").unwrap();

            let mut line = String::new();
            loop {
                line.clear();
                if reader.read_line(&mut line).unwrap_or(0) == 0 {
                    break;
                }
                let command = line.trim_end().to_string();
                log.lock().unwrap().push(command.clone());
                // Inside a command list the daemon stays silent until
                // `command_list_end`, then sends the accumulated output with
                // a single trailing OK.
                let reply: &[u8] = if command.starts_with("update") {
                    b"updating_db: 1\nOK\n"
                } else if command.starts_with("idle") {
                    b"changed: database\nOK\n"
                } else if command.starts_with("addid") {
                    b"Id: 7\nOK\n"
                } else if command.starts_with("command_list_begin")
                    || command.starts_with("replay_gain_status")
                {
                    b""
                } else if command.starts_with("command_list_end") {
                    b"OK\n"
                } else if command.starts_with("status") {
                    b"volume: 100\nrepeat: 0\nrandom: 0\nsingle: 0\nconsume: 0\n\
                      playlist: 2\nplaylistlength: 3\nstate: stop\n"
                } else {
                    b"OK\n"
                };
                writer.write_all(reply).unwrap();
            }
        });

        (address, seen)
    }

    #[tokio::test]
    async fn enqueue_sends_relative_uri_and_reports_queue_length() {
        let (address, seen) = fake_daemon();
        let player = PlayerClient::new(&address, Duration::from_secs(2), Duration::from_secs(2));

        let queue_len = player.enqueue("fancy_song.mp3").await.unwrap();
        assert_eq!(queue_len, 3);

        let seen = seen.lock().unwrap();
        let addid = seen
            .iter()
            .find(|command| command.starts_with("addid"))
            .expect("addid was sent");
        assert!(addid.contains("fancy_song.mp3"));
        // The URI must stay library-relative on the wire.
        assert!(!addid.contains('/'));
    }
}

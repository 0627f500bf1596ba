//! Console session
//!
//! Wires the playback core to the simulated platform and runs typed commands
//! against one room.

use crate::commands::{parse_line, Command, HELP};
use crate::config::ConsoleConfig;
use crate::error::{ConsoleError, Result};
use crate::sim::{LogPresence, SimVoice, TerminalSurface};
use discodj_core::types::SurfaceId;
use discodj_core::{Clock, Resolver, ResourceFactory, RoomId, SystemClock, VoiceContext};
use discodj_playback::{
    dispatch, dispatch_button, format_time, Actor, Collaborators, EnqueuePosition, PlaybackController,
    PlaybackError, RoomInfo, RoomRegistry,
};
use discodj_resolver::{StreamResourceFactory, YtDlp, YtDlpResolver};
use discodj_storage::{JsonSnapshotStore, PlaylistStore};
use std::fmt::Write as _;
use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{error, info};

/// What a command produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Reply(String),
    Quit,
}

pub struct Session {
    controller: Arc<PlaybackController>,
    playlists: PlaylistStore,
    voice: Arc<SimVoice>,
    surface: Arc<TerminalSurface>,
    room: RoomId,
    surface_id: SurfaceId,
    actor: Actor,
}

impl Session {
    /// Session backed by yt-dlp and the JSON store under `storage.data_dir`
    pub fn from_config(config: &ConsoleConfig) -> Result<Self> {
        let resolver_config = config.resolver_config();
        let ytdlp = YtDlp::new(&resolver_config);
        let resolver: Arc<dyn Resolver> = Arc::new(YtDlpResolver::with_ytdlp(&resolver_config, ytdlp.clone())?);
        let resources: Arc<dyn ResourceFactory> = Arc::new(StreamResourceFactory::new(&resolver_config, ytdlp));
        Ok(Self::with_collaborators(config, resolver, resources, Arc::new(SystemClock), true))
    }

    /// Session with the given resolution backend and clock
    pub fn with_collaborators(
        config: &ConsoleConfig,
        resolver: Arc<dyn Resolver>,
        resources: Arc<dyn ResourceFactory>,
        clock: Arc<dyn Clock>,
        echo: bool,
    ) -> Self {
        let voice = Arc::new(SimVoice::new());
        let surface = Arc::new(TerminalSurface::new(echo));
        let data_dir = config.storage.data_dir.clone();

        let deps = Collaborators {
            resolver,
            resources,
            voice: voice.clone(),
            surface: surface.clone(),
            presence: Arc::new(LogPresence::default()),
            store: Arc::new(JsonSnapshotStore::new(data_dir.clone())),
            clock,
        };
        let playback = config.playback_config();
        let registry = Arc::new(RoomRegistry::new(playback.history_size));
        let controller = PlaybackController::new(playback, registry, deps);

        let session = &config.console;
        let voice_context = match session.voice_channel() {
            Some(channel) => VoiceContext::in_channel(channel),
            None => VoiceContext::default(),
        };
        Self {
            controller,
            playlists: PlaylistStore::new(data_dir),
            voice,
            surface,
            room: RoomId::new(session.room_id.clone()),
            surface_id: SurfaceId::new(session.surface_id.clone()),
            actor: Actor {
                id: "console".to_string(),
                tag: session.user_tag.clone(),
                is_dj: session.is_dj,
                voice: voice_context,
            },
        }
    }

    pub fn controller(&self) -> &Arc<PlaybackController> {
        &self.controller
    }

    pub fn voice(&self) -> &Arc<SimVoice> {
        &self.voice
    }

    pub fn surface(&self) -> &Arc<TerminalSurface> {
        &self.surface
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }

    /// Restore the room from disk; returns the number of queued tracks
    pub async fn restore(&self) -> Result<usize> {
        Ok(self.controller.load_room(&self.room).await?)
    }

    pub async fn execute(&self, command: Command) -> Result<Outcome> {
        let reply = match command {
            Command::Control(event) => {
                dispatch(&self.controller, &self.room, &self.surface_id, &self.actor, event).await?
            }
            Command::Press(control_id) => {
                let Some(message) = self.controller.panel_ref(&self.room).and_then(|p| p.message) else {
                    return Ok(Outcome::Reply("There is no panel to press.".into()));
                };
                dispatch_button(&self.controller, &self.room, &message, &control_id, &self.actor)
                    .await?
                    .unwrap_or_else(|| format!("Nothing happens for '{}'.", control_id))
            }
            Command::SavePlaylist(name) => self.save_playlist(&name).await?,
            Command::LoadPlaylist(name) => self.load_playlist(&name).await?,
            Command::DeletePlaylist(name) => {
                if self.playlists.delete(&self.room, &name).await? {
                    format!("Deleted playlist '{}'.", name.trim())
                } else {
                    format!("No playlist named '{}'.", name.trim())
                }
            }
            Command::ListPlaylists => self.list_playlists().await?,
            Command::Listeners(count) => {
                if self.controller.on_membership_change(&self.room, count).await? {
                    "Everyone left, so did I. Playback is on hold.".into()
                } else {
                    format!("{} listening.", count)
                }
            }
            Command::Finish => {
                let finished = self.voice.sink(&self.room).is_some_and(|sink| sink.finish_now());
                if !finished {
                    return Err(PlaybackError::NothingPlaying.into());
                }
                "Track ran out.".into()
            }
            Command::DeletePanel => {
                let deleted = self
                    .controller
                    .panel_ref(&self.room)
                    .and_then(|p| p.message)
                    .is_some_and(|message| self.surface.delete(&message));
                if deleted {
                    "Panel deleted.".into()
                } else {
                    "No panel to delete.".into()
                }
            }
            Command::Status => status_text(&self.controller.info(&self.room).await?),
            Command::Help => HELP.to_string(),
            Command::Quit => return Ok(Outcome::Quit),
        };
        Ok(Outcome::Reply(reply))
    }

    async fn save_playlist(&self, name: &str) -> Result<String> {
        let info = self.controller.info(&self.room).await?;
        let tracks: Vec<_> = info.now_playing.into_iter().chain(info.queue).collect();
        if tracks.is_empty() {
            return Err(ConsoleError::usage("Nothing to save: the queue is empty."));
        }
        let saved = self.playlists.save(&self.room, name, tracks).await?;
        Ok(format!("Saved playlist '{}' ({} tracks).", saved.name, saved.count))
    }

    async fn load_playlist(&self, name: &str) -> Result<String> {
        let playlist = self.playlists.require(&self.room, name).await?;
        if self
            .controller
            .ensure_connected(&self.room, &self.actor.voice)
            .await?
            .is_none()
        {
            return Err(PlaybackError::NotInVoice.into());
        }
        let added = self
            .controller
            .enqueue(&self.room, playlist.tracks, EnqueuePosition::End)
            .await?;
        if self.controller.info(&self.room).await?.now_playing.is_none() {
            self.controller.play_next(&self.room, None).await?;
        }
        Ok(format!("Loaded playlist '{}': {} tracks queued.", playlist.name, added))
    }

    async fn list_playlists(&self) -> Result<String> {
        let playlists = self.playlists.list(&self.room).await?;
        if playlists.is_empty() {
            return Ok("No saved playlists.".into());
        }
        let mut out = String::new();
        for playlist in playlists {
            let _ = writeln!(
                out,
                "{} ({} tracks, saved {})",
                playlist.name,
                playlist.count,
                playlist.saved_at.format("%Y-%m-%d %H:%M")
            );
        }
        Ok(out.trim_end().to_string())
    }

    /// Read commands from `input` until it ends or `quit`
    pub async fn run<R>(&self, input: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            let command = match parse_line(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    println!("{}", e);
                    continue;
                }
            };
            match self.execute(command).await {
                Ok(Outcome::Reply(reply)) => println!("{}", reply),
                Ok(Outcome::Quit) => break,
                Err(e) if e.is_user_error() => println!("{}", e),
                Err(e) => {
                    error!(room = %self.room, error = %e, "command failed");
                    println!("Something went wrong: {}", e);
                }
            }
        }
        info!(room = %self.room, "input closed");
        Ok(())
    }

    /// Run until the input ends or `stop` fires, then shut down
    ///
    /// The shutdown also runs when reading input failed.
    pub async fn run_until<R, S>(&self, input: R, stop: S) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        S: Future<Output = ()>,
    {
        let result = tokio::select! {
            result = self.run(input) => result,
            () = stop => Ok(()),
        };
        self.shutdown().await?;
        result
    }

    /// Persist and leave every room
    pub async fn shutdown(&self) -> Result<()> {
        Ok(self.controller.shutdown().await?)
    }
}

/// Multi-line summary of a room
pub fn status_text(info: &RoomInfo) -> String {
    let mut out = String::new();
    match &info.now_playing {
        Some(track) => {
            let elapsed = info.progress.map_or(0.0, |p| p.elapsed);
            let total = track
                .known_duration()
                .map_or_else(|| "?".to_string(), format_time);
            let _ = writeln!(
                out,
                "{:?}: {} ({} / {})",
                info.status,
                track.title,
                format_time(elapsed),
                total
            );
        }
        None => {
            let _ = writeln!(out, "Idle");
        }
    }
    let _ = writeln!(
        out,
        "Queue: {} | History: {} | Volume: {}% | Loop: {} | Autoplay: {} | DJ-only: {}",
        info.queue.len(),
        info.history.len(),
        info.settings.volume,
        info.settings.loop_mode,
        if info.settings.autoplay { "on" } else { "off" },
        if info.settings.dj_only { "on" } else { "off" },
    );
    let filter = info.filter.map_or("none", |f| f.key());
    let _ = write!(
        out,
        "Filter: {} | Voice: {}",
        filter,
        if info.connected { "connected" } else { "disconnected" }
    );
    out
}

//! discodj Resolver
//!
//! Media resolution for the playback core: URLs and free-text queries become
//! [`Track`](discodj_core::Track)s through yt-dlp, Spotify links become
//! placeholders through oEmbed, and tracks become direct streams for ffmpeg.
//!
//! # Example
//!
//! ```rust,no_run
//! use discodj_core::{Requester, Resolver};
//! use discodj_resolver::{ResolverConfig, YtDlpResolver};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = YtDlpResolver::new(&ResolverConfig::default())?;
//! let tracks = resolver
//!     .resolve("never gonna give you up", &Requester::new("1", "listener"))
//!     .await?;
//! println!("found {}", tracks.len());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod cache;
pub mod config;
pub mod error;
pub mod query;
pub mod resolver;
pub mod runner;
pub mod spotify;
pub mod stream;
pub mod ytdlp;

pub use config::ResolverConfig;
pub use error::{ResolverError, Result};
pub use query::{Query, SpotifyKind};
pub use resolver::YtDlpResolver;
pub use runner::{CommandOutput, CommandRunner, ProcessRunner};
pub use stream::{ffmpeg_args, StreamResourceFactory};
pub use ytdlp::{MediaInfo, YtDlp};

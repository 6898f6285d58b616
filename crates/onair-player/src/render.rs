//! Now-playing payload → display fields.
//!
//! `render` is pure; `apply` overwrites only the fields the payload carries,
//! which mirrors how the page patched its DOM.

use onair_proto::i18n::Locale;
use onair_proto::protocol::{
    CurrentLine, DisplayState, HistoryLine, NowPlaying, QueueEntry, Song, TrackInfo, TrackLine,
    VolumeIcon,
};

pub const HISTORY_LIMIT: usize = 5;

/// Rendered view of one payload. `None` fields leave the display untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NowPlayingView {
    pub current: CurrentLine,
    pub next: Option<TrackLine>,
    pub history: Option<Vec<HistoryLine>>,
    pub listeners: Option<String>,
}

/// `m:ss`; missing or NaN renders as `0:00`.
pub fn format_time(seconds: Option<f64>) -> String {
    let secs = match seconds {
        Some(s) if s.is_finite() && s >= 0.0 => s,
        _ => return "0:00".to_string(),
    };
    let mins = (secs / 60.0).floor() as u64;
    let rem = (secs % 60.0).floor() as u64;
    format!("{}:{:02}", mins, rem)
}

fn title_of(song: Option<&Song>, locale: Locale) -> String {
    song.and_then(|s| s.title.as_deref())
        .filter(|t| !t.is_empty())
        .unwrap_or(locale.strings().unknown_track)
        .to_string()
}

fn artist_of(song: Option<&Song>, locale: Locale) -> String {
    song.and_then(|s| s.artist.as_deref())
        .filter(|a| !a.is_empty())
        .unwrap_or(locale.strings().unknown_artist)
        .to_string()
}

fn track_line(entry: &QueueEntry, locale: Locale) -> TrackLine {
    TrackLine {
        title: title_of(entry.song.as_ref(), locale),
        artist: artist_of(entry.song.as_ref(), locale),
    }
}

pub fn render(payload: &NowPlaying, locale: Locale) -> NowPlayingView {
    let current = match &payload.now_playing {
        Some(np) => {
            let song = np.song.as_ref();
            CurrentLine {
                title: title_of(song, locale),
                artist: artist_of(song, locale),
                progress: format!(
                    "{} / {}",
                    format_time(np.elapsed),
                    format_time(np.duration)
                ),
                duration: format_time(np.duration),
            }
        }
        None => CurrentLine {
            title: locale.strings().no_data.to_string(),
            artist: String::new(),
            progress: String::new(),
            duration: String::new(),
        },
    };

    let next = payload.playing_next.as_ref().map(|e| track_line(e, locale));

    let history = payload.song_history.as_ref().map(|entries| {
        entries
            .iter()
            .take(HISTORY_LIMIT)
            .enumerate()
            .map(|(i, entry)| {
                let line = track_line(entry, locale);
                HistoryLine {
                    title: line.title,
                    artist: line.artist,
                    duration: entry
                        .duration
                        .filter(|d| *d > 0.0)
                        .map(|d| format_time(Some(d))),
                    is_new: i == 0,
                }
            })
            .collect()
    });

    let listeners = payload
        .listeners
        .as_ref()
        .and_then(|l| l.current)
        .filter(|&n| n > 0)
        .map(|n| locale.listeners(n));

    NowPlayingView {
        current,
        next,
        history,
        listeners,
    }
}

/// Structured track info for `PlayerState`, if the payload has a current entry.
pub fn track_info(payload: &NowPlaying, locale: Locale) -> Option<TrackInfo> {
    let np = payload.now_playing.as_ref()?;
    let song = np.song.as_ref();
    Some(TrackInfo {
        title: title_of(song, locale),
        artist: artist_of(song, locale),
        elapsed_seconds: np.elapsed.filter(|e| e.is_finite()).unwrap_or(0.0),
        duration_seconds: np.duration.filter(|d| d.is_finite()).unwrap_or(0.0),
    })
}

/// Overwrite the display fields present in `view`.
pub fn apply(display: &mut DisplayState, view: NowPlayingView) {
    display.current = Some(view.current);
    if let Some(next) = view.next {
        display.next = Some(next);
    }
    if let Some(history) = view.history {
        display.history = Some(history);
    }
    if let Some(listeners) = view.listeners {
        display.listeners = Some(listeners);
    }
}

pub fn volume_icon(volume: f32, muted: bool) -> VolumeIcon {
    if muted || volume <= 0.0 {
        VolumeIcon::Mute
    } else if volume < 0.5 {
        VolumeIcon::Down
    } else {
        VolumeIcon::Up
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onair_proto::protocol::{CurrentEntry, Listeners};

    fn song(title: &str, artist: &str) -> Option<Song> {
        Some(Song {
            title: Some(title.to_string()),
            artist: Some(artist.to_string()),
        })
    }

    #[test]
    fn format_time_basics() {
        assert_eq!(format_time(Some(0.0)), "0:00");
        assert_eq!(format_time(Some(9.9)), "0:09");
        assert_eq!(format_time(Some(125.0)), "2:05");
        assert_eq!(format_time(Some(3600.0)), "60:00");
        assert_eq!(format_time(Some(f64::NAN)), "0:00");
        assert_eq!(format_time(None), "0:00");
    }

    #[test]
    fn empty_song_fields_render_placeholders() {
        let payload = NowPlaying {
            now_playing: Some(CurrentEntry {
                song: song("", ""),
                elapsed: Some(f64::NAN),
                duration: Some(125.0),
            }),
            ..Default::default()
        };
        let view = render(&payload, Locale::En);
        assert_eq!(view.current.title, "Unknown track");
        assert_eq!(view.current.artist, "Unknown artist");
        assert_eq!(view.current.progress, "0:00 / 2:05");
        assert_eq!(view.current.duration, "2:05");

        let ru = render(&payload, Locale::Ru);
        assert_eq!(ru.current.title, "Неизвестный трек");
        assert_eq!(ru.current.artist, "Неизвестный исполнитель");
    }

    #[test]
    fn history_is_capped_to_five_in_input_order() {
        let history: Vec<QueueEntry> = (1..=7)
            .map(|i| QueueEntry {
                song: song(&format!("t{}", i), &format!("a{}", i)),
                duration: Some(60.0 * i as f64),
            })
            .collect();
        let payload = NowPlaying {
            song_history: Some(history),
            ..Default::default()
        };
        let lines = render(&payload, Locale::En).history.unwrap();
        assert_eq!(lines.len(), 5);
        let titles: Vec<_> = lines.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["t1", "t2", "t3", "t4", "t5"]);
        assert!(lines[0].is_new);
        assert!(lines[1..].iter().all(|l| !l.is_new));
        assert_eq!(lines[1].duration.as_deref(), Some("2:00"));
    }

    #[test]
    fn history_entry_without_duration_omits_it() {
        let payload = NowPlaying {
            song_history: Some(vec![QueueEntry::default()]),
            ..Default::default()
        };
        let lines = render(&payload, Locale::En).history.unwrap();
        assert_eq!(lines[0].title, "Unknown track");
        assert!(lines[0].duration.is_none());
    }

    #[test]
    fn listeners_use_plural_rule() {
        let payload = |n| NowPlaying {
            listeners: Some(Listeners { current: Some(n) }),
            ..Default::default()
        };
        assert_eq!(
            render(&payload(2), Locale::Ru).listeners.as_deref(),
            Some("2 слушателя")
        );
        assert_eq!(render(&payload(0), Locale::Ru).listeners, None);
    }

    #[test]
    fn missing_now_playing_shows_no_data() {
        let view = render(&NowPlaying::default(), Locale::En);
        assert_eq!(view.current.title, "No data");
        assert_eq!(view.current.artist, "");
        assert!(track_info(&NowPlaying::default(), Locale::En).is_none());
    }

    #[test]
    fn apply_only_overwrites_present_fields() {
        let mut display = DisplayState::default();
        let full = NowPlaying {
            now_playing: Some(CurrentEntry {
                song: song("Now", "Artist"),
                elapsed: Some(5.0),
                duration: Some(100.0),
            }),
            playing_next: Some(QueueEntry {
                song: song("Next", "Other"),
                duration: None,
            }),
            listeners: Some(Listeners { current: Some(3) }),
            ..Default::default()
        };
        apply(&mut display, render(&full, Locale::En));
        assert_eq!(display.next.as_ref().unwrap().title, "Next");

        let sparse = NowPlaying {
            now_playing: Some(CurrentEntry {
                song: song("Later", "Artist"),
                elapsed: None,
                duration: None,
            }),
            ..Default::default()
        };
        apply(&mut display, render(&sparse, Locale::En));
        assert_eq!(display.current.as_ref().unwrap().title, "Later");
        assert_eq!(display.next.as_ref().unwrap().title, "Next");
        assert_eq!(display.listeners.as_deref(), Some("3 listeners"));
    }

    #[test]
    fn volume_icon_thresholds() {
        assert_eq!(volume_icon(0.8, true), VolumeIcon::Mute);
        assert_eq!(volume_icon(0.0, false), VolumeIcon::Mute);
        assert_eq!(volume_icon(0.3, false), VolumeIcon::Down);
        assert_eq!(volume_icon(0.5, false), VolumeIcon::Up);
    }
}

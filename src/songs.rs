//! Song catalog and vocal-range matching.
//!
//! A song matches when the singer's measured range fully contains the
//! song's required range. Matching is a linear scan that keeps catalog order.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{log_catalog_error, CatalogError};
use crate::notes::midi_note_to_name;

/// A catalog entry with its required range as MIDI note numbers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub title: String,
    pub artist: String,
    pub min: i32,
    pub max: i32,
}

impl Song {
    pub fn new(title: impl Into<String>, artist: impl Into<String>, min: i32, max: i32) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            min,
            max,
        }
    }

    /// Whether `[lowest_note, highest_note]` contains this song's range
    pub fn fits(&self, lowest_note: i32, highest_note: i32) -> bool {
        lowest_note <= self.min && highest_note >= self.max
    }

    pub fn min_name(&self) -> String {
        midi_note_to_name(self.min)
    }

    pub fn max_name(&self) -> String {
        midi_note_to_name(self.max)
    }
}

/// Builtin catalog as (title, artist, min, max), grouped from low to high
const BUILTIN_SONGS: [(&str, &str, i32, i32); 10] = [
    // C3-C4
    ("情熱大陸", "葉加瀬太郎", 48, 60),
    ("366日", "HY", 50, 62),
    // C4-G4
    ("Jupiter", "平原綾香", 55, 67),
    ("恋", "星野源", 57, 69),
    // G4-C5
    ("TSUNAMI", "サザンオールスターズ", 60, 72),
    ("シュガーソングとビターステップ", "UNISON SQUARE GARDEN", 62, 74),
    // C5-G5
    ("レット・イット・ゴー", "松たか子", 67, 79),
    ("残酷な天使のテーゼ", "高橋洋子", 69, 81),
    // G5 and up
    ("シャルル", "バルーン", 74, 86),
    ("アイノカタチ", "MISIA", 76, 88),
];

/// Ordered list of songs available for matching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SongCatalog {
    songs: Vec<Song>,
}

impl Default for SongCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SongCatalog {
    /// The ten-song catalog shipped with the crate
    pub fn builtin() -> Self {
        Self {
            songs: BUILTIN_SONGS
                .iter()
                .map(|&(title, artist, min, max)| Song::new(title, artist, min, max))
                .collect(),
        }
    }

    /// Build a catalog from songs, rejecting untitled entries and inverted ranges
    pub fn from_songs(songs: Vec<Song>) -> Result<Self, CatalogError> {
        for (index, song) in songs.iter().enumerate() {
            if song.title.trim().is_empty() {
                return Err(CatalogError::InvalidSong {
                    index,
                    reason: "empty title".to_string(),
                });
            }
            if song.min > song.max {
                return Err(CatalogError::InvalidSong {
                    index,
                    reason: format!("min {} > max {}", song.min, song.max),
                });
            }
        }
        Ok(Self { songs })
    }

    /// Parse a JSON array of `{title, artist, min, max}` objects
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let songs: Vec<Song> = serde_json::from_str(json)?;
        Self::from_songs(songs)
    }

    /// Load a catalog from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let result = fs::read_to_string(path)
            .map_err(|err| CatalogError::Io {
                path: path.display().to_string(),
                reason: err.to_string(),
            })
            .and_then(|contents| Self::from_json(&contents));

        match &result {
            Ok(catalog) => log::info!(
                "[Catalog] Loaded {} songs from {}",
                catalog.len(),
                path.display()
            ),
            Err(err) => log_catalog_error(err, "load_from_file"),
        }
        result
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Songs whose range fits inside `[lowest_note, highest_note]`.
    ///
    /// A note number of 0 (or below) means the bound was not measured and
    /// yields no matches.
    pub fn matching(&self, lowest_note: i32, highest_note: i32) -> Vec<&Song> {
        if lowest_note <= 0 || highest_note <= 0 {
            return Vec::new();
        }
        self.songs
            .iter()
            .filter(|song| song.fits(lowest_note, highest_note))
            .collect()
    }
}

/// Match against the builtin catalog
pub fn match_songs(lowest_note: i32, highest_note: i32) -> Vec<Song> {
    SongCatalog::builtin()
        .matching(lowest_note, highest_note)
        .into_iter()
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let catalog = SongCatalog::builtin();
        assert_eq!(catalog.len(), 10);
        assert_eq!(catalog.songs()[0].title, "情熱大陸");
        assert!(catalog.songs().iter().all(|s| s.min <= s.max));
    }

    #[test]
    fn test_low_range_match() {
        let matches = match_songs(48, 60);
        assert!(matches
            .iter()
            .any(|s| s.title == "情熱大陸" && s.min == 48 && s.max == 60));
        assert!(matches.iter().all(|s| s.max <= 60 && s.min >= 48));
    }

    #[test]
    fn test_unmeasured_bounds_match_nothing() {
        assert!(match_songs(0, 0).is_empty());
        assert!(match_songs(0, 72).is_empty());
        assert!(match_songs(48, 0).is_empty());
        assert!(match_songs(-5, 90).is_empty());
    }

    #[test]
    fn test_wide_range_keeps_catalog_order() {
        let matches = match_songs(40, 100);
        let titles: Vec<_> = matches.iter().map(|s| s.title.as_str()).collect();
        let expected: Vec<_> = BUILTIN_SONGS.iter().map(|s| s.0).collect();
        assert_eq!(titles, expected);
    }

    #[test]
    fn test_middle_range() {
        let titles: Vec<_> = match_songs(55, 72)
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["Jupiter", "恋", "TSUNAMI"]);
    }

    #[test]
    fn test_range_names() {
        let song = Song::new("TSUNAMI", "サザンオールスターズ", 60, 72);
        assert_eq!(song.min_name(), "C4");
        assert_eq!(song.max_name(), "C5");
    }

    #[test]
    fn test_from_json() {
        let catalog = SongCatalog::from_json(
            r#"[{"title": "Scale", "artist": "Test", "min": 60, "max": 64}]"#,
        )
        .unwrap();
        assert_eq!(catalog.matching(60, 64).len(), 1);
        assert!(catalog.matching(61, 64).is_empty());
    }

    #[test]
    fn test_rejects_inverted_range() {
        let err = SongCatalog::from_json(
            r#"[{"title": "Backwards", "artist": "Test", "min": 70, "max": 60}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidSong { index: 0, .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = SongCatalog::load_from_file("/nonexistent/songs.json").unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }
}
